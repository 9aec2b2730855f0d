//! Relay JSON endpoints.
//!
//! These hold the payment and fulfillment secrets on the server side. The
//! checkout page of a relay-backed storefront calls them instead of talking
//! to the payment provider directly.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use psychosis_core::checkout::{PaymentConfirmationRequest, RelayErrorBody, RelaySessionRequest};
use tracing::instrument;

use crate::services::RelayError;
use crate::state::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(RelayErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn capture(err: &RelayError, message: &str) {
    let event_id = sentry::capture_error(err);
    tracing::error!(error = %err, sentry_event_id = %event_id, "{message}");
}

/// `POST /create-checkout-session`
///
/// Bad input, including items the catalog does not sell, gets `400` with
/// the reason; provider failures get `502`.
#[instrument(skip_all)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<RelaySessionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Rejected checkout session request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.relay().create_checkout_session(&request).await {
        Ok(session) => Json(session).into_response(),
        Err(e) if e.is_bad_request() => {
            tracing::info!(error = %e, "Rejected checkout session request");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            capture(&e, "Failed to create checkout session");
            error_response(StatusCode::BAD_GATEWAY, "Failed to create checkout session")
        }
    }
}

/// `POST /payment-success`
///
/// An unpaid session gets `400 Payment not completed` and no order is placed.
#[instrument(skip_all)]
pub async fn payment_success(
    State(state): State<AppState>,
    payload: Result<Json<PaymentConfirmationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::info!(error = %rejection, "Rejected payment confirmation");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state.relay().confirm_payment(&request.session_id).await {
        Ok(confirmation) => Json(confirmation).into_response(),
        Err(e @ RelayError::NotPaid(_)) => {
            tracing::warn!(session_id = %request.session_id, "Payment confirmation for unpaid session");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            capture(&e, "Failed to process payment");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process payment")
        }
    }
}
