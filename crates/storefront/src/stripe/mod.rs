//! Stripe Checkout client.
//!
//! # Architecture
//!
//! - Hosted payment pages only: card details never reach this server
//! - Sessions are opened with the form-encoded REST API (`/v1/checkout/sessions`)
//! - [`PaymentGateway`] is the seam used by the checkout services, so tests can
//!   swap in a fake provider
//!
//! # Example
//!
//! ```rust,ignore
//! use psychosis_storefront::stripe::{PaymentGateway, StripeClient};
//!
//! let stripe = StripeClient::new(&config.stripe)?;
//! let session = stripe.create_session(&request).await?;
//! let details = stripe.retrieve_session(&session.id).await?;
//! ```

mod client;
pub mod types;

use std::collections::BTreeMap;

use async_trait::async_trait;
use psychosis_core::checkout::{CheckoutSession, HostedCheckoutRequest, PaymentStatus};
use psychosis_core::fulfillment::ShippingAddress;
use thiserror::Error;

pub use client::{StripeClient, encode_session_form};

/// Errors that can occur when talking to Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A created session came back without a hosted page URL.
    #[error("Session {0} has no payment page URL")]
    MissingUrl(String),
}

/// What the store needs to know about a session after the shopper returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetails {
    pub id: String,
    pub payment_status: PaymentStatus,
    /// Shipping address collected on the hosted page, if any.
    pub shipping: Option<ShippingAddress>,
    /// Metadata attached when the session was created.
    pub metadata: BTreeMap<String, String>,
}

/// Opens and inspects hosted payment sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted payment session.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the request or is unreachable.
    async fn create_session(
        &self,
        request: &HostedCheckoutRequest,
    ) -> Result<CheckoutSession, StripeError>;

    /// Look up a session by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the session does not exist or the provider is
    /// unreachable.
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, StripeError>;
}
