//! HTTP client for the Printful REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use psychosis_core::Catalog;
use psychosis_core::fulfillment::FulfillmentOrder;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::conversions::convert_sync_product;
use super::types::{
    Envelope, ErrorEnvelope, OrderResult, SyncProductDetail, SyncProductSummary,
};
use super::{FulfillmentProvider, PlacedOrder, PrintfulError};
use crate::config::PrintfulConfig;

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Printful API client.
#[derive(Clone)]
pub struct PrintfulClient {
    inner: Arc<PrintfulClientInner>,
}

struct PrintfulClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl PrintfulClient {
    /// Create a new Printful API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &PrintfulConfig) -> Result<Self, PrintfulError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| PrintfulError::Parse(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(PrintfulClientInner {
                client,
                api_base: config.api_base.clone(),
            }),
        })
    }

    /// Unwrap the `{code, result}` envelope of a response.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PrintfulError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| {
                    envelope
                        .error
                        .map(|e| e.message)
                        .or_else(|| envelope.result.map(|r| r.to_string()))
                })
                .unwrap_or_else(|| body.chars().take(200).collect());
            tracing::error!(status = %status, message = %message, "Printful API returned non-success status");
            return Err(PrintfulError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| PrintfulError::Parse(e.to_string()))?;
        Ok(envelope.result)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PrintfulError> {
        let response = self
            .inner
            .client
            .get(format!("{}{path}", self.inner.api_base))
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl FulfillmentProvider for PrintfulClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Catalog, PrintfulError> {
        let summaries: Vec<SyncProductSummary> = self.get("/store/products").await?;

        let mut products = Vec::with_capacity(summaries.len());
        for summary in summaries.iter().filter(|s| !s.is_ignored) {
            let detail: SyncProductDetail =
                self.get(&format!("/store/products/{}", summary.id)).await?;

            match convert_sync_product(&detail) {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!(product_id = summary.id, error = %e, "Skipping unsellable product");
                }
            }
        }

        debug!(count = products.len(), "Fetched Printful catalog");
        Ok(Catalog::new(products))
    }

    #[instrument(skip(self, order), fields(external_id = %order.external_id, items = order.items.len()))]
    async fn create_order(&self, order: &FulfillmentOrder) -> Result<PlacedOrder, PrintfulError> {
        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.api_base))
            .json(order)
            .send()
            .await?;

        let result: OrderResult = Self::decode(response).await?;
        tracing::info!(order_id = result.id, status = %result.status, "Printful order created");

        Ok(PlacedOrder {
            id: result.id,
            status: result.status,
        })
    }
}
