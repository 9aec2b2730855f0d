//! Certified Psychosis storefront library.
//!
//! This crate provides the storefront and checkout relay as a library,
//! allowing the router to be tested without binding a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod printful;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

use axum::{
    Router,
    extract::Request,
    http::Uri,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Directory served under `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the storefront router with its middleware stack.
///
/// Sentry layers are added by the binary so tests stay free of a Sentry hub.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .fallback(not_found)
        .layer(session_layer)
        .layer(from_fn_with_state(
            middleware::SessionLocks::new(),
            middleware::session_lock_middleware,
        ))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

async fn not_found(uri: Uri) -> error::AppError {
    error::AppError::NotFound(uri.path().to_string())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
