//! Printful print-on-demand client.
//!
//! Supplies the remote catalog (store sync products) and places fulfillment
//! orders once a payment has been confirmed.

mod client;
mod conversions;
pub mod types;

use async_trait::async_trait;
use psychosis_core::Catalog;
use psychosis_core::fulfillment::FulfillmentOrder;
use thiserror::Error;

pub use client::PrintfulClient;
pub use conversions::convert_sync_product;

/// Errors that can occur when interacting with the Printful API.
#[derive(Debug, Error)]
pub enum PrintfulError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Reference Printful assigns to a created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: i64,
    pub status: String,
}

/// Catalog source and order sink.
#[async_trait]
pub trait FulfillmentProvider: Send + Sync {
    /// Fetch every synced product with its variants.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing or any product detail request fails.
    async fn list_products(&self) -> Result<Catalog, PrintfulError>;

    /// Submit an order for printing and shipping.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the order or is unreachable.
    async fn create_order(&self, order: &FulfillmentOrder) -> Result<PlacedOrder, PrintfulError>;
}
