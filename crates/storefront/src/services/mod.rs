//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Product catalog with remote fetch and static fallback
//! - `checkout` - Checkout initiator and the payment backends it drives
//! - `relay` - Server-side session creation and post-payment fulfillment

pub mod catalog;
pub mod checkout;
pub mod relay;

pub use catalog::CatalogService;
pub use checkout::{
    CheckoutError, CheckoutStep, HostedBackend, PaymentBackend, RelayBackend, initiate_checkout,
    submit_customer_details,
};
pub use relay::{RelayError, RelayService};
