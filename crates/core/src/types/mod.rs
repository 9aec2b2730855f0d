//! Value types shared by the catalog, cart and checkout.

pub mod country;
pub mod email;
pub mod id;
pub mod price;

pub use country::{CountryCode, UnsupportedCountry};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError, STORE_CURRENCY};
