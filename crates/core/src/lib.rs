//! Certified Psychosis core - catalog, cart and checkout types.
//!
//! This crate models the storefront's cart and checkout handoff without any
//! I/O, so every invariant can be unit tested:
//!
//! - [`catalog`] - products, size variants and the built-in fallback catalog
//! - [`cart`] - the ordered, session-local cart and its totals
//! - [`customer`] - validated customer details from the checkout form
//! - [`checkout`] - hosted payment and relay payloads, checkout state machine
//! - [`fulfillment`] - print-on-demand order payloads
//! - [`notice`] - user-visible success and error messages
//! - [`types`] - ids, prices, email addresses and country codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod fulfillment;
pub mod notice;
pub mod types;

pub use cart::{Cart, CartError, CartLine};
pub use catalog::{Catalog, CatalogError, Product, Variant};
pub use customer::{CustomerForm, CustomerInfo, ValidationError};
pub use notice::{Notice, NoticeKind};
pub use types::*;
