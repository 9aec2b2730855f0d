//! Checkout route handlers.
//!
//! These drive the checkout attempt stored in the session:
//!
//! ```text
//! POST /checkout          Idle -> CollectingCustomerInfo        (relay backend)
//!                         Idle -> RequestingSession -> Redirected (hosted backend)
//! POST /checkout/details  CollectingCustomerInfo -> RequestingSession -> Redirected
//! ```
//!
//! Any failure leaves the cart untouched and is shown as a notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use psychosis_core::checkout::{CheckoutEvent, CheckoutState};
use psychosis_core::{CountryCode, CustomerForm, Notice};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::session::{load_cart, load_checkout_state, save_checkout_state};
use crate::routes::cart::CartView;
use crate::routes::htmx;
use crate::services::{CheckoutError, CheckoutStep, initiate_checkout, submit_customer_details};
use crate::state::AppState;

/// Country choice in the customer form.
#[derive(Debug, Clone)]
pub struct CountryOption {
    pub code: &'static str,
    pub name: &'static str,
    pub selected: bool,
}

/// Customer details page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/details.html")]
pub struct CustomerDetailsTemplate {
    pub form: CustomerForm,
    pub countries: Vec<CountryOption>,
    pub cart: CartView,
    /// Blocking message shown above the form.
    pub error: Option<String>,
}

impl CustomerDetailsTemplate {
    fn new(form: CustomerForm, cart: CartView, error: Option<String>) -> Self {
        let countries = CountryCode::ALL
            .iter()
            .map(|country| CountryOption {
                code: country.code(),
                name: country.name(),
                selected: form.country.eq_ignore_ascii_case(country.code()),
            })
            .collect();

        Self {
            form,
            countries,
            cart,
            error,
        }
    }
}

/// Apply `event`, starting a fresh attempt if the stored one cannot take it.
///
/// Shoppers can reload or go back at any point, so a stale stored state is
/// never treated as an error.
fn advance(state: CheckoutState, event: CheckoutEvent, needs_customer_form: bool) -> CheckoutState {
    match state.apply(event.clone()) {
        Ok(next) => next,
        Err(e) => {
            tracing::debug!(error = %e, "Restarting checkout attempt");
            CheckoutState::Idle
                .apply(CheckoutEvent::Begin {
                    needs_customer_form,
                })
                .and_then(|begun| begun.apply(event))
                .unwrap_or_default()
        }
    }
}

/// Begin checkout (HTMX or plain form post).
///
/// An empty cart only raises a notice. Otherwise the shopper is sent to the
/// customer form or straight to the payment page.
#[instrument(skip(state, session, headers))]
pub async fn begin(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let cart = load_cart(&session).await?;
    let backend = state.backend();
    let needs_customer_form = backend.needs_customer_form();

    let attempt = load_checkout_state(&session).await?;
    let begin_event = CheckoutEvent::Begin {
        needs_customer_form,
    };

    match initiate_checkout(backend, &cart).await {
        Ok(CheckoutStep::CollectCustomerInfo) => {
            let attempt = advance(attempt, begin_event, needs_customer_form);
            save_checkout_state(&session, &attempt).await?;
            Ok(htmx::redirect(&headers, "/checkout/details"))
        }
        Ok(CheckoutStep::Redirect { session: checkout, url }) => {
            let attempt = advance(attempt, begin_event, needs_customer_form);
            let attempt = advance(
                attempt,
                CheckoutEvent::SessionCreated {
                    session_id: checkout.id,
                },
                needs_customer_form,
            );
            save_checkout_state(&session, &attempt).await?;
            Ok(htmx::redirect(&headers, url.as_str()))
        }
        Err(e) => {
            report(&e);
            if !matches!(e, CheckoutError::EmptyCart(_)) {
                save_checkout_state(&session, &CheckoutState::Idle).await?;
            }
            if htmx::is_htmx(&headers) {
                Ok(htmx::notice_only(&e.notice()))
            } else {
                Ok(htmx::with_notice(&e.notice(), htmx::redirect(&headers, "/")))
            }
        }
    }
}

/// Display the customer details form.
#[instrument(skip(state, session, headers))]
pub async fn details_page(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let cart = load_cart(&session).await?;
    if cart.is_empty() || !state.backend().needs_customer_form() {
        return Ok(htmx::redirect(&headers, "/"));
    }

    let attempt = load_checkout_state(&session).await?;
    if attempt != CheckoutState::CollectingCustomerInfo {
        let attempt = advance(
            attempt,
            CheckoutEvent::Begin {
                needs_customer_form: true,
            },
            true,
        );
        save_checkout_state(&session, &attempt).await?;
    }

    Ok(CustomerDetailsTemplate::new(CustomerForm::default(), CartView::from(&cart), None)
        .into_response())
}

/// Validate customer details and send the shopper to the payment page.
///
/// Validation and upstream failures re-render the form with the submitted
/// values and a blocking message.
#[instrument(skip(state, session, headers, form))]
pub async fn submit_details(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CustomerForm>,
) -> Result<Response> {
    let cart = load_cart(&session).await?;
    if cart.is_empty() {
        let notice = Notice::error("Your cart is empty");
        return Ok(htmx::with_notice(&notice, htmx::redirect(&headers, "/")));
    }

    let attempt = advance(
        load_checkout_state(&session).await?,
        CheckoutEvent::CustomerSubmitted,
        true,
    );

    match submit_customer_details(state.backend(), &cart, &form).await {
        Ok((checkout, url)) => {
            let attempt = advance(
                attempt,
                CheckoutEvent::SessionCreated {
                    session_id: checkout.id,
                },
                true,
            );
            save_checkout_state(&session, &attempt).await?;
            Ok(htmx::redirect(&headers, url.as_str()))
        }
        Err(e) => {
            report(&e);
            let attempt = if e.is_user_error() {
                CheckoutState::CollectingCustomerInfo
            } else {
                advance(attempt, CheckoutEvent::SessionFailed, true)
            };
            save_checkout_state(&session, &attempt).await?;

            let status = if e.is_user_error() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::BAD_GATEWAY
            };
            let notice = e.notice();
            let page = CustomerDetailsTemplate::new(
                form,
                CartView::from(&cart),
                Some(notice.message.clone()),
            );
            Ok(htmx::with_notice(&notice, (status, page)))
        }
    }
}

/// Log checkout failures; upstream ones also go to Sentry.
fn report(err: &CheckoutError) {
    if err.is_user_error() {
        tracing::info!(error = %err, "Checkout halted");
    } else {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Checkout failed");
    }
}
