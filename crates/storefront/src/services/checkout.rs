//! Checkout initiator.
//!
//! One checkout flow, parameterised by a [`PaymentBackend`]:
//!
//! - [`HostedBackend`] opens the hosted payment page straight away and lets
//!   the payment provider collect the shipping address.
//! - [`RelayBackend`] collects customer details locally and goes through the
//!   relay endpoints, which place the fulfillment order once payment clears.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use psychosis_core::checkout::{
    CheckoutSession, Confirmation, EmptyCartError, HostedCheckoutRequest,
    PaymentConfirmationRequest, RelayErrorBody, RelaySessionRequest, UnfulfillableLine,
};
use psychosis_core::{Cart, CartLine, CustomerForm, CustomerInfo, Notice, ValidationError};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::stripe::{PaymentGateway, StripeError};

/// Relay request timeout.
const RELAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while starting a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to pay for.
    #[error(transparent)]
    EmptyCart(#[from] EmptyCartError),

    /// A customer field is missing or invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A cart line has no fulfillment reference.
    #[error(transparent)]
    Unfulfillable(#[from] UnfulfillableLine),

    /// The backend needs customer details that were not supplied.
    #[error("Customer details are required")]
    MissingCustomer,

    /// The payment provider failed.
    #[error("Payment provider error: {0}")]
    Gateway(#[from] StripeError),

    /// The relay could not be reached.
    #[error("Relay request failed: {0}")]
    Relay(#[from] reqwest::Error),

    /// The relay answered with an error body.
    #[error("Relay error: {status} - {message}")]
    RelayRejected { status: u16, message: String },

    /// The payment page URL is unusable.
    #[error("Invalid payment page URL: {0}")]
    InvalidUrl(String),
}

impl CheckoutError {
    /// Problems the shopper can fix; everything else is an upstream failure.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyCart(_) | Self::Validation(_) | Self::MissingCustomer
        )
    }

    /// Notice shown to the shopper. Upstream details stay in the logs.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::EmptyCart(_) | Self::Validation(_) | Self::MissingCustomer => {
                Notice::from_error(self)
            }
            Self::Unfulfillable(e) => Notice::error(format!(
                "{e}. Please remove it from your cart and try again."
            )),
            Self::Gateway(_) | Self::Relay(_) | Self::RelayRejected { .. } | Self::InvalidUrl(_) => {
                Notice::error("Checkout failed. Please try again.")
            }
        }
    }
}

/// Opens payment sessions and confirms them afterwards.
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Whether customer details are collected locally before payment.
    fn needs_customer_form(&self) -> bool;

    /// Open a payment session for `lines`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lines or customer are unacceptable or the
    /// upstream call fails.
    async fn create_session(
        &self,
        lines: &[CartLine],
        customer: Option<&CustomerInfo>,
    ) -> Result<CheckoutSession, CheckoutError>;

    /// Where to send the shopper to pay.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidUrl`] unless the session URL is an
    /// absolute http(s) URL.
    fn redirect_to_pay(&self, session: &CheckoutSession) -> Result<Url, CheckoutError> {
        let url = Url::parse(&session.url).map_err(|e| CheckoutError::InvalidUrl(e.to_string()))?;
        if matches!(url.scheme(), "http" | "https") {
            Ok(url)
        } else {
            Err(CheckoutError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )))
        }
    }

    /// Confirm a session after the shopper returns from the payment page.
    ///
    /// Returns `None` when the backend has nothing to confirm.
    ///
    /// # Errors
    ///
    /// Returns an error if payment was not completed or the upstream call fails.
    async fn confirm_payment(&self, session_id: &str)
    -> Result<Option<Confirmation>, CheckoutError>;
}

/// Next step after the shopper presses checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutStep {
    /// Show the local customer form.
    CollectCustomerInfo,
    /// Send the shopper to the payment page.
    Redirect { session: CheckoutSession, url: Url },
}

/// Start a checkout for `cart`.
///
/// An empty cart fails before the backend is called.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] for an empty cart, or the backend's
/// error when opening the session fails.
#[instrument(skip_all, fields(lines = cart.line_count()))]
pub async fn initiate_checkout(
    backend: &dyn PaymentBackend,
    cart: &Cart,
) -> Result<CheckoutStep, CheckoutError> {
    if cart.is_empty() {
        return Err(EmptyCartError.into());
    }

    if backend.needs_customer_form() {
        return Ok(CheckoutStep::CollectCustomerInfo);
    }

    let session = backend.create_session(cart.lines(), None).await?;
    let url = backend.redirect_to_pay(&session)?;
    Ok(CheckoutStep::Redirect { session, url })
}

/// Validate the customer form and open a payment session.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] or [`CheckoutError::Validation`]
/// without calling the backend, otherwise the backend's error.
#[instrument(skip_all, fields(lines = cart.line_count()))]
pub async fn submit_customer_details(
    backend: &dyn PaymentBackend,
    cart: &Cart,
    form: &CustomerForm,
) -> Result<(CheckoutSession, Url), CheckoutError> {
    if cart.is_empty() {
        return Err(EmptyCartError.into());
    }

    let customer = CustomerInfo::from_form(form)?;
    let session = backend.create_session(cart.lines(), Some(&customer)).await?;
    let url = backend.redirect_to_pay(&session)?;
    Ok((session, url))
}

// =============================================================================
// HostedBackend
// =============================================================================

/// Opens the payment provider's hosted page directly.
pub struct HostedBackend {
    gateway: Arc<dyn PaymentGateway>,
    success_url: String,
    cancel_url: String,
}

impl HostedBackend {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }
}

#[async_trait]
impl PaymentBackend for HostedBackend {
    fn needs_customer_form(&self) -> bool {
        false
    }

    async fn create_session(
        &self,
        lines: &[CartLine],
        customer: Option<&CustomerInfo>,
    ) -> Result<CheckoutSession, CheckoutError> {
        let mut request =
            HostedCheckoutRequest::for_lines(lines, &self.success_url, &self.cancel_url)?;
        if let Some(customer) = customer {
            request.customer_email = Some(customer.email.clone());
        }
        Ok(self.gateway.create_session(&request).await?)
    }

    async fn confirm_payment(
        &self,
        _session_id: &str,
    ) -> Result<Option<Confirmation>, CheckoutError> {
        Ok(None)
    }
}

// =============================================================================
// RelayBackend
// =============================================================================

/// Talks to the relay endpoints over HTTP.
pub struct RelayBackend {
    client: reqwest::Client,
    relay_url: String,
}

impl RelayBackend {
    /// Create a relay backend for the relay at `relay_url` (no trailing slash).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(relay_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(RELAY_TIMEOUT).build()?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, CheckoutError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{path}", self.relay_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<RelayErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            return Err(CheckoutError::RelayRejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentBackend for RelayBackend {
    fn needs_customer_form(&self) -> bool {
        true
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    async fn create_session(
        &self,
        lines: &[CartLine],
        customer: Option<&CustomerInfo>,
    ) -> Result<CheckoutSession, CheckoutError> {
        if lines.is_empty() {
            return Err(EmptyCartError.into());
        }
        let customer = customer.ok_or(CheckoutError::MissingCustomer)?;

        let body = RelaySessionRequest {
            items: lines.to_vec(),
            customer: customer.clone(),
        };
        self.post("/create-checkout-session", &body).await
    }

    #[instrument(skip(self))]
    async fn confirm_payment(
        &self,
        session_id: &str,
    ) -> Result<Option<Confirmation>, CheckoutError> {
        let body = PaymentConfirmationRequest {
            session_id: session_id.to_owned(),
        };
        self.post("/payment-success", &body).await.map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use psychosis_core::Catalog;
    use psychosis_core::types::ProductId;

    use super::*;
    use crate::stripe::SessionDetails;

    /// Backend that records every session request.
    #[derive(Default)]
    struct CountingBackend {
        form: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PaymentBackend for CountingBackend {
        fn needs_customer_form(&self) -> bool {
            self.form
        }

        async fn create_session(
            &self,
            _lines: &[CartLine],
            _customer: Option<&CustomerInfo>,
        ) -> Result<CheckoutSession, CheckoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CheckoutSession {
                id: "cs_test_1".to_string(),
                url: "https://checkout.stripe.com/c/pay/cs_test_1".to_string(),
            })
        }

        async fn confirm_payment(
            &self,
            _session_id: &str,
        ) -> Result<Option<Confirmation>, CheckoutError> {
            Ok(None)
        }
    }

    /// Gateway that keeps the last request it was given.
    #[derive(Default)]
    struct RecordingGateway {
        last: Mutex<Option<HostedCheckoutRequest>>,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_session(
            &self,
            request: &HostedCheckoutRequest,
        ) -> Result<CheckoutSession, StripeError> {
            *self.last.lock().unwrap() = Some(request.clone());
            Ok(CheckoutSession {
                id: "cs_test_hosted".to_string(),
                url: "https://checkout.stripe.com/c/pay/cs_test_hosted".to_string(),
            })
        }

        async fn retrieve_session(&self, _session_id: &str) -> Result<SessionDetails, StripeError> {
            Err(StripeError::Parse("not used".to_string()))
        }
    }

    fn cart() -> Cart {
        let catalog = Catalog::fallback();
        let mut cart = Cart::new();
        cart.add_line(catalog.find(ProductId::new(2)).unwrap(), Some("M"))
            .unwrap();
        cart
    }

    fn form() -> CustomerForm {
        CustomerForm {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address: "12 St James's Square".to_string(),
            city: "London".to_string(),
            state: "LND".to_string(),
            zip: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_backend() {
        let backend = CountingBackend::default();
        let err = initiate_checkout(&backend, &Cart::new()).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart(_)));
        assert_eq!(err.notice().message, "Your cart is empty");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_form_backend_asks_for_details_first() {
        let backend = CountingBackend {
            form: true,
            ..Default::default()
        };
        let step = initiate_checkout(&backend, &cart()).await.unwrap();

        assert_eq!(step, CheckoutStep::CollectCustomerInfo);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_direct_backend_redirects_to_payment_page() {
        let backend = CountingBackend::default();
        let step = initiate_checkout(&backend, &cart()).await.unwrap();

        let CheckoutStep::Redirect { session, url } = step else {
            panic!("expected redirect");
        };
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(url.host_str(), Some("checkout.stripe.com"));
    }

    #[tokio::test]
    async fn test_invalid_customer_never_reaches_backend() {
        let backend = CountingBackend {
            form: true,
            ..Default::default()
        };
        let mut form = form();
        form.city = "  ".to_string();

        let err = submit_customer_details(&backend, &cart(), &form)
            .await
            .unwrap_err();
        assert_eq!(err.notice().message, "City is required");
        assert!(err.is_user_error());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hosted_backend_builds_rounded_request() {
        let gateway = Arc::new(RecordingGateway::default());
        let backend = HostedBackend::new(
            gateway.clone(),
            "https://shop.test/success?session_id={CHECKOUT_SESSION_ID}",
            "https://shop.test/cancel",
        );

        let session = backend.create_session(cart().lines(), None).await.unwrap();
        assert_eq!(session.id, "cs_test_hosted");
        assert!(backend.confirm_payment(&session.id).await.unwrap().is_none());

        let request = gateway.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.line_items.len(), 1);
        assert_eq!(request.total_minor_units(), 3999);
        assert_eq!(request.cancel_url, "https://shop.test/cancel");
        assert!(request.customer_email.is_none());
    }

    #[test]
    fn test_redirect_rejects_non_http_urls() {
        let backend = CountingBackend::default();
        let session = CheckoutSession {
            id: "cs".to_string(),
            url: "javascript:alert(1)".to_string(),
        };
        assert!(matches!(
            backend.redirect_to_pay(&session),
            Err(CheckoutError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_upstream_errors_hide_details() {
        let err = CheckoutError::RelayRejected {
            status: 502,
            message: "stripe exploded".to_string(),
        };
        assert_eq!(err.notice().message, "Checkout failed. Please try again.");
        assert!(!err.is_user_error());
    }

    #[tokio::test]
    async fn test_relay_backend_requires_customer() {
        let backend = RelayBackend::new("http://127.0.0.1:9").unwrap();
        let err = backend
            .create_session(cart().lines(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingCustomer));
    }
}
