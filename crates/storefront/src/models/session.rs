//! Per-shopper state kept in the session.
//!
//! The cart and the current checkout attempt are the only things stored.
//! Both are loaded at the start of a handler, changed in memory and written
//! back before the response is rendered.

use psychosis_core::Cart;
use psychosis_core::checkout::CheckoutState;
use tower_sessions::Session;

/// Session keys.
pub mod keys {
    /// Key for the shopper's cart.
    pub const CART: &str = "cart";

    /// Key for the current checkout attempt.
    pub const CHECKOUT_STATE: &str = "checkout_state";
}

/// Load the cart, or an empty one for a new session.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored value is corrupt.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

/// Load the checkout attempt, `Idle` if none was started.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored value is corrupt.
pub async fn load_checkout_state(
    session: &Session,
) -> Result<CheckoutState, tower_sessions::session::Error> {
    Ok(session
        .get::<CheckoutState>(keys::CHECKOUT_STATE)
        .await?
        .unwrap_or_default())
}

/// Store the checkout attempt.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_checkout_state(
    session: &Session,
    state: &CheckoutState,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CHECKOUT_STATE, state).await
}
