//! Catalog source with remote fetch, caching and static fallback.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use psychosis_core::types::ProductId;
use psychosis_core::{Catalog, Product};
use tracing::{debug, instrument};

use crate::printful::FulfillmentProvider;

const CACHE_KEY: &str = "catalog";

/// How long a fetched catalog is served before refetching.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Supplies the products shown in the storefront.
///
/// With a fulfillment provider configured, products come from its store
/// listing and are cached for 5 minutes. Any fetch failure, or an empty
/// listing, degrades to [`Catalog::fallback`]. Failures are not cached.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    provider: Option<Arc<dyn FulfillmentProvider>>,
    cache: Cache<&'static str, Arc<Catalog>>,
    fallback: Arc<Catalog>,
}

impl CatalogService {
    /// Create a catalog service. `None` serves the static list only.
    #[must_use]
    pub fn new(provider: Option<Arc<dyn FulfillmentProvider>>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner {
                provider,
                cache,
                fallback: Arc::new(Catalog::fallback()),
            }),
        }
    }

    /// The current catalog.
    #[instrument(skip(self))]
    pub async fn catalog(&self) -> Arc<Catalog> {
        let Some(provider) = &self.inner.provider else {
            return Arc::clone(&self.inner.fallback);
        };

        if let Some(catalog) = self.inner.cache.get(CACHE_KEY).await {
            debug!("Cache hit for catalog");
            return catalog;
        }

        match provider.list_products().await {
            Ok(catalog) if !catalog.is_empty() => {
                let catalog = Arc::new(catalog);
                self.inner
                    .cache
                    .insert(CACHE_KEY, Arc::clone(&catalog))
                    .await;
                catalog
            }
            Ok(_) => {
                tracing::warn!("Remote catalog is empty, using fallback products");
                Arc::clone(&self.inner.fallback)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch remote catalog, using fallback products");
                Arc::clone(&self.inner.fallback)
            }
        }
    }

    /// Look up one product in the current catalog.
    pub async fn find(&self, id: ProductId) -> Option<Product> {
        self.catalog().await.find(id).cloned()
    }
}
