//! Payment return pages.
//!
//! The payment provider sends shoppers back to `/success` or `/cancel`.
//! Arriving here ends the checkout attempt stored in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use psychosis_core::Notice;
use psychosis_core::checkout::{CheckoutEvent, CheckoutState};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::session::{load_cart, load_checkout_state, save_cart, save_checkout_state};
use crate::state::AppState;

/// Query string the payment provider appends to the success URL.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Order success page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/success.html")]
pub struct SuccessTemplate {
    /// Non-fatal problem confirming the order.
    pub notice: Option<Notice>,
}

/// Order cancelled page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/cancel.html")]
pub struct CancelTemplate;

/// Display the order success page and confirm the payment.
///
/// Confirmation only runs for the session this shopper was redirected to,
/// so reloading the page never confirms twice. A failed confirmation is shown
/// as a notice; the page itself still renders.
#[instrument(skip(state, session))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SuccessQuery>,
) -> Result<impl IntoResponse> {
    let attempt = load_checkout_state(&session).await?;

    let pending = match (&attempt, query.session_id.as_deref()) {
        (CheckoutState::RedirectedToPayment { session_id }, Some(returned))
            if session_id == returned =>
        {
            Some(session_id.clone())
        }
        _ => None,
    };

    let Some(session_id) = pending else {
        tracing::debug!(state = ?attempt, "Success page without a pending payment");
        return Ok(SuccessTemplate { notice: None });
    };

    let (event, notice) = match state.backend().confirm_payment(&session_id).await {
        Ok(confirmation) => {
            if let Some(confirmation) = confirmation {
                tracing::info!(session_id = %session_id, message = %confirmation.message, "Payment confirmed");
            }
            (CheckoutEvent::Confirmed, None)
        }
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, session_id = %session_id, "Payment confirmation failed");
            (
                CheckoutEvent::Failed,
                Some(Notice::error(
                    "We could not confirm your order yet. If you were charged, we will be in touch by email.",
                )),
            )
        }
    };

    let next = attempt.apply(event).unwrap_or_default();
    if next == CheckoutState::PaymentConfirmed {
        let mut cart = load_cart(&session).await?;
        cart.clear();
        save_cart(&session, &cart).await?;
    }
    save_checkout_state(&session, &next).await?;

    Ok(SuccessTemplate { notice })
}

/// Display the order cancelled page.
#[instrument(skip(session))]
pub async fn cancel(session: Session) -> Result<impl IntoResponse> {
    let attempt = load_checkout_state(&session).await?;
    if attempt.session_id().is_some() {
        let next = attempt.apply(CheckoutEvent::Cancelled).unwrap_or_default();
        save_checkout_state(&session, &next).await?;
    }
    Ok(CancelTemplate)
}
