//! Integration test harness for the Certified Psychosis storefront.
//!
//! Router tests drive [`psychosis_storefront::app`] in-process with
//! `tower::ServiceExt::oneshot`, backed by the fakes in this crate so no
//! payment or fulfillment provider is contacted. Live tests against a running
//! server are `#[ignore]`d.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p psychosis-integration-tests
//!
//! # Live tests against a running storefront
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p psychosis-integration-tests -- --ignored
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use psychosis_core::Catalog;
use psychosis_core::checkout::{CheckoutSession, HostedCheckoutRequest, PaymentStatus};
use psychosis_core::fulfillment::FulfillmentOrder;
use psychosis_storefront::config::{CheckoutBackendKind, StorefrontConfig, StripeConfig};
use psychosis_storefront::printful::{FulfillmentProvider, PlacedOrder, PrintfulError};
use psychosis_storefront::state::AppState;
use psychosis_storefront::stripe::{PaymentGateway, SessionDetails, StripeError};
use secrecy::SecretString;
use tower::ServiceExt;

/// Base URL used by in-process test configurations.
pub const TEST_BASE_URL: &str = "http://localhost:3000";

/// Base URL for live tests (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| TEST_BASE_URL.to_string())
}

/// Configuration for in-process tests.
#[must_use]
pub fn test_config(backend: CheckoutBackendKind, relay_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: TEST_BASE_URL.to_string(),
        checkout_backend: backend,
        relay_url: relay_url.trim_end_matches('/').to_string(),
        stripe: StripeConfig {
            api_base: "http://stripe.invalid".to_string(),
            secret_key: SecretString::from("sk_test_integration".to_string()),
        },
        printful: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

// =============================================================================
// Fake payment gateway
// =============================================================================

/// In-memory payment gateway.
///
/// Sessions it opens keep the request metadata so that retrieving them later
/// behaves like the real provider. Every session reports `status`.
pub struct FakeGateway {
    status: PaymentStatus,
    created: Mutex<Vec<HostedCheckoutRequest>>,
    retrieved: AtomicUsize,
}

impl FakeGateway {
    #[must_use]
    pub fn new(status: PaymentStatus) -> Arc<Self> {
        Arc::new(Self {
            status,
            created: Mutex::new(Vec::new()),
            retrieved: AtomicUsize::new(0),
        })
    }

    /// Session requests received so far.
    #[must_use]
    pub fn created(&self) -> Vec<HostedCheckoutRequest> {
        self.created.lock().unwrap().clone()
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    #[must_use]
    pub fn retrieved_count(&self) -> usize {
        self.retrieved.load(Ordering::SeqCst)
    }

    fn session_id(index: usize) -> String {
        format!("cs_test_{index}")
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: &HostedCheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let id = Self::session_id(created.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, StripeError> {
        self.retrieved.fetch_add(1, Ordering::SeqCst);

        let created = self.created.lock().unwrap();
        let metadata = created
            .iter()
            .enumerate()
            .find(|(index, _)| Self::session_id(index + 1) == session_id)
            .map(|(_, request)| request.metadata.clone())
            .ok_or_else(|| StripeError::Api {
                status: 404,
                message: format!("No such checkout.session: '{session_id}'"),
            })?;

        Ok(SessionDetails {
            id: session_id.to_string(),
            payment_status: self.status,
            shipping: None,
            metadata,
        })
    }
}

/// Payment gateway whose every call fails.
pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_session(
        &self,
        _request: &HostedCheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        Err(StripeError::Api {
            status: 500,
            message: "provider unavailable".to_string(),
        })
    }

    async fn retrieve_session(&self, _session_id: &str) -> Result<SessionDetails, StripeError> {
        Err(StripeError::Api {
            status: 500,
            message: "provider unavailable".to_string(),
        })
    }
}

// =============================================================================
// Fake fulfillment provider
// =============================================================================

/// In-memory fulfillment provider.
///
/// `catalog: None` makes every listing fail.
pub struct FakeFulfillment {
    catalog: Option<Catalog>,
    listed: AtomicUsize,
    orders: Mutex<Vec<FulfillmentOrder>>,
}

impl FakeFulfillment {
    #[must_use]
    pub fn new(catalog: Option<Catalog>) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            listed: AtomicUsize::new(0),
            orders: Mutex::new(Vec::new()),
        })
    }

    /// Orders placed so far.
    #[must_use]
    pub fn orders(&self) -> Vec<FulfillmentOrder> {
        self.orders.lock().unwrap().clone()
    }

    #[must_use]
    pub fn listed_count(&self) -> usize {
        self.listed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FulfillmentProvider for FakeFulfillment {
    async fn list_products(&self) -> Result<Catalog, PrintfulError> {
        self.listed.fetch_add(1, Ordering::SeqCst);
        self.catalog.clone().ok_or_else(|| PrintfulError::Api {
            status: 503,
            message: "store unavailable".to_string(),
        })
    }

    async fn create_order(&self, order: &FulfillmentOrder) -> Result<PlacedOrder, PrintfulError> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());
        Ok(PlacedOrder {
            id: i64::try_from(orders.len()).unwrap_or(i64::MAX),
            status: "draft".to_string(),
        })
    }
}

// =============================================================================
// Test application
// =============================================================================

/// An in-process storefront plus the fakes behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub fulfillment: Arc<FakeFulfillment>,
    /// Session cookie (`name=value`) carried between requests.
    cookie: Option<String>,
}

impl TestApp {
    /// A storefront using the fallback catalog and a gateway reporting `status`.
    #[must_use]
    pub fn new(backend: CheckoutBackendKind, status: PaymentStatus) -> Self {
        Self::with_relay_url(backend, status, TEST_BASE_URL)
    }

    #[must_use]
    pub fn with_relay_url(
        backend: CheckoutBackendKind,
        status: PaymentStatus,
        relay_url: &str,
    ) -> Self {
        let gateway = FakeGateway::new(status);
        Self::build(backend, relay_url, gateway.clone(), gateway, None)
    }

    /// A storefront whose fulfillment provider lists `catalog`.
    #[must_use]
    pub fn with_catalog(
        backend: CheckoutBackendKind,
        status: PaymentStatus,
        catalog: Catalog,
    ) -> Self {
        let gateway = FakeGateway::new(status);
        Self::build(backend, TEST_BASE_URL, gateway.clone(), gateway, Some(catalog))
    }

    /// A storefront whose payment provider is `provider`.
    ///
    /// The `gateway` field is then an unused fake.
    #[must_use]
    pub fn with_gateway(backend: CheckoutBackendKind, provider: Arc<dyn PaymentGateway>) -> Self {
        Self::build(
            backend,
            TEST_BASE_URL,
            provider,
            FakeGateway::new(PaymentStatus::Unpaid),
            None,
        )
    }

    fn build(
        backend: CheckoutBackendKind,
        relay_url: &str,
        provider: Arc<dyn PaymentGateway>,
        gateway: Arc<FakeGateway>,
        catalog: Option<Catalog>,
    ) -> Self {
        let fulfillment = FakeFulfillment::new(catalog);
        let provided: Arc<dyn FulfillmentProvider> = fulfillment.clone();
        let state =
            AppState::with_providers(test_config(backend, relay_url), provider, Some(provided))
                .unwrap();

        Self {
            router: psychosis_storefront::app(state.clone()),
            state,
            gateway,
            fulfillment,
            cookie: None,
        }
    }

    /// Another shopper on the same server, without a session cookie.
    #[must_use]
    pub fn stranger(&self) -> Self {
        Self {
            router: self.router.clone(),
            state: self.state.clone(),
            gateway: Arc::clone(&self.gateway),
            fulfillment: Arc::clone(&self.fulfillment),
            cookie: None,
        }
    }

    /// Attach the current session cookie, if any.
    fn with_cookie(&self, mut request: Request<Body>) -> Request<Body> {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }
        request
    }

    /// An HTMX form POST carrying the current session cookie, for sending
    /// outside [`TestApp::send`], e.g. concurrently through `router`.
    #[must_use]
    pub fn form_request(&self, uri: &str, form: &[(&str, &str)]) -> Request<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();

        self.with_cookie(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header("hx-request", "true")
                .body(Body::from(body))
                .unwrap(),
        )
    }

    /// Send a request, keeping the session cookie like a browser would.
    pub async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let request = self.with_cookie(request);
        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// POST an urlencoded form as HTMX would.
    pub async fn post_form(&mut self, uri: &str, form: &[(&str, &str)]) -> Response<Body> {
        let request = self.form_request(uri, form);
        self.send(request).await
    }

    pub async fn post_json(&mut self, uri: &str, json: &serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Read a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// The `notify` notice carried in an `HX-Trigger` header, if any.
#[must_use]
pub fn notice(response: &Response<Body>) -> Option<serde_json::Value> {
    let trigger = response.headers().get("hx-trigger")?.to_str().ok()?;
    let value: serde_json::Value = serde_json::from_str(trigger).ok()?;
    value.get("notify").cloned()
}

/// Customer form fields that pass validation.
#[must_use]
pub fn valid_customer_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("email", "ada@example.com"),
        ("first_name", "Ada"),
        ("last_name", "Lovelace"),
        ("address", "12 St James's Square"),
        ("city", "London"),
        ("state", "LND"),
        ("zip", "SW1Y 4JH"),
        ("country", "GB"),
    ]
}

/// Metadata of the `index`-th (1-based) session the gateway opened.
#[must_use]
pub fn session_metadata(gateway: &FakeGateway, index: usize) -> BTreeMap<String, String> {
    gateway
        .created()
        .get(index - 1)
        .map(|request| request.metadata.clone())
        .unwrap_or_default()
}
