//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{CheckoutBackendKind, StorefrontConfig};
use crate::printful::{FulfillmentProvider, PrintfulClient, PrintfulError};
use crate::services::{CatalogService, HostedBackend, PaymentBackend, RelayBackend, RelayService};
use crate::stripe::{PaymentGateway, StripeClient, StripeError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("printful client: {0}")]
    Printful(#[from] PrintfulError),
    #[error("relay client: {0}")]
    Relay(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration, the catalog and the payment integrations.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogService,
    backend: Arc<dyn PaymentBackend>,
    relay: RelayService,
}

impl AppState {
    /// Create application state with the real Stripe and Printful clients.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeClient::new(&config.stripe)?);
        let fulfillment: Option<Arc<dyn FulfillmentProvider>> = match &config.printful {
            Some(printful) => {
                let client: Arc<dyn FulfillmentProvider> = Arc::new(PrintfulClient::new(printful)?);
                Some(client)
            }
            None => {
                tracing::warn!("PRINTFUL_API_KEY not set, serving static catalog only");
                None
            }
        };

        Self::with_providers(config, gateway, fulfillment)
    }

    /// Create application state around the given providers.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay HTTP client cannot be built.
    pub fn with_providers(
        config: StorefrontConfig,
        gateway: Arc<dyn PaymentGateway>,
        fulfillment: Option<Arc<dyn FulfillmentProvider>>,
    ) -> Result<Self, StateError> {
        let backend: Arc<dyn PaymentBackend> = match config.checkout_backend {
            CheckoutBackendKind::Hosted => Arc::new(HostedBackend::new(
                Arc::clone(&gateway),
                config.success_url(),
                config.cancel_url(),
            )),
            CheckoutBackendKind::Relay => Arc::new(RelayBackend::new(config.relay_url.clone())?),
        };

        let catalog = CatalogService::new(fulfillment.clone());
        let relay = RelayService::new(
            catalog.clone(),
            gateway,
            fulfillment,
            config.success_url(),
            config.cancel_url(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                catalog,
                backend,
                relay,
                config,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get the configured payment backend.
    #[must_use]
    pub fn backend(&self) -> &dyn PaymentBackend {
        self.inner.backend.as_ref()
    }

    /// Get a reference to the relay service.
    #[must_use]
    pub fn relay(&self) -> &RelayService {
        &self.inner.relay
    }
}
