//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (product grid and cart)
//! GET  /health                 - Health check
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart container fragment
//! POST /cart/add               - Add product in a size (cart fragment + notice)
//! POST /cart/remove            - Remove line by position (cart fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! POST /checkout               - Begin checkout
//! GET  /checkout/details       - Customer details form
//! POST /checkout/details       - Submit details, redirect to payment
//! GET  /success                - Payment return, confirms the order
//! GET  /cancel                 - Payment abandoned
//!
//! # Relay (JSON)
//! POST /create-checkout-session - Open a hosted payment session
//! POST /payment-success         - Confirm payment and place the order
//! ```

pub mod cart;
pub mod checkout;
pub mod home;
pub mod htmx;
pub mod pages;
pub mod relay;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::begin))
        .route(
            "/details",
            get(checkout::details_page).post(checkout::submit_details),
        )
}

/// Create the relay routes router.
pub fn relay_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create-checkout-session",
            post(relay::create_checkout_session),
        )
        .route("/payment-success", post(relay::payment_success))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .nest("/checkout", checkout_routes())
        // Payment return pages
        .route("/success", get(pages::success))
        .route("/cancel", get(pages::cancel))
        // Relay endpoints
        .merge(relay_routes())
}
