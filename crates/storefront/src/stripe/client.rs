//! HTTP client for the Stripe REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use psychosis_core::checkout::{CheckoutSession, HostedCheckoutRequest};
use psychosis_core::types::STORE_CURRENCY;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::types::{StripeCheckoutSession, StripeErrorEnvelope};
use super::{PaymentGateway, SessionDetails, StripeError};
use crate::config::StripeConfig;

/// Outbound request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Parse(format!("Invalid secret key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.clone(),
            }),
        })
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.inner.api_base)
    }

    /// URL of one session. The id is untrusted and escaped as a single path
    /// segment.
    fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/{}",
            self.sessions_url(),
            urlencoding::encode(session_id)
        )
    }

    /// Decode a response body, turning non-2xx statuses into [`StripeError::Api`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body).map_or_else(
                |_| body.chars().take(200).collect(),
                |envelope| {
                    envelope
                        .error
                        .message
                        .or(envelope.error.kind)
                        .unwrap_or_default()
                },
            );
            tracing::error!(status = %status, message = %message, "Stripe API returned non-success status");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| StripeError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_session(
        &self,
        request: &HostedCheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .inner
            .client
            .post(self.sessions_url())
            .form(&encode_session_form(request))
            .send()
            .await?;

        let session: StripeCheckoutSession = Self::decode(response).await?;
        let url = session
            .url
            .ok_or_else(|| StripeError::MissingUrl(session.id.clone()))?;

        tracing::info!(session_id = %session.id, "Stripe checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionDetails, StripeError> {
        let response = self
            .inner
            .client
            .get(self.session_url(session_id))
            .send()
            .await?;

        let session: StripeCheckoutSession = Self::decode(response).await?;
        Ok(session.into())
    }
}

/// Flatten a hosted checkout request into Stripe's bracketed form fields.
///
/// ```text
/// line_items[0][price_data][product_data][name]=Insanity Tee (M)
/// line_items[0][price_data][unit_amount]=3999
/// shipping_address_collection[allowed_countries][0]=US
/// ```
#[must_use]
pub fn encode_session_form(request: &HostedCheckoutRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_owned(), request.mode.as_str().to_owned()),
        ("payment_method_types[0]".to_owned(), "card".to_owned()),
        ("success_url".to_owned(), request.success_url.clone()),
        ("cancel_url".to_owned(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            STORE_CURRENCY.to_owned(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        for (j, image) in item.images.iter().enumerate() {
            form.push((
                format!("{prefix}[price_data][product_data][images][{j}]"),
                image.clone(),
            ));
        }
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_minor_units.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    for (i, country) in request.allowed_shipping_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.code().to_owned(),
        ));
    }

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_owned(), email.as_str().to_owned()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use psychosis_core::checkout::{LineItem, METADATA_CUSTOMER_INFO};
    use psychosis_core::{CustomerForm, CustomerInfo};

    use super::*;

    fn request() -> HostedCheckoutRequest {
        let mut request = HostedCheckoutRequest {
            line_items: vec![LineItem {
                name: "Insanity Tee (M)".to_string(),
                images: vec!["https://img.test/tee.png".to_string()],
                unit_amount_minor_units: 3999,
                quantity: 1,
            }],
            mode: psychosis_core::checkout::CheckoutMode::Payment,
            success_url: "https://shop.test/success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "https://shop.test/cancel".to_string(),
            allowed_shipping_countries: psychosis_core::CountryCode::ALL.to_vec(),
            customer_email: None,
            metadata: std::collections::BTreeMap::new(),
        };
        let customer = CustomerInfo::from_form(&CustomerForm {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address: "12 St James's Square".to_string(),
            city: "London".to_string(),
            state: "LND".to_string(),
            zip: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
        })
        .unwrap();
        request.customer_email = Some(customer.email.clone());
        request
            .metadata
            .insert(METADATA_CUSTOMER_INFO.to_string(), "{}".to_string());
        request
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_encode_line_items() {
        let form = encode_session_form(&request());

        assert_eq!(field(&form, "mode"), Some("payment"));
        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][name]"),
            Some("Insanity Tee (M)")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][unit_amount]"),
            Some("3999")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][currency]"),
            Some("usd")
        );
        assert_eq!(
            field(&form, "line_items[0][price_data][product_data][images][0]"),
            Some("https://img.test/tee.png")
        );
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("1"));
    }

    #[test]
    fn test_encode_shipping_customer_and_metadata() {
        let form = encode_session_form(&request());

        assert_eq!(
            field(&form, "shipping_address_collection[allowed_countries][0]"),
            Some("US")
        );
        assert_eq!(
            field(&form, "shipping_address_collection[allowed_countries][3]"),
            Some("AU")
        );
        assert_eq!(field(&form, "customer_email"), Some("ada@example.com"));
        assert_eq!(field(&form, "metadata[customer_info]"), Some("{}"));
        assert_eq!(
            field(&form, "success_url"),
            Some("https://shop.test/success?session_id={CHECKOUT_SESSION_ID}")
        );
    }

    fn client() -> StripeClient {
        StripeClient::new(&StripeConfig {
            api_base: "https://api.stripe.test".to_string(),
            secret_key: secrecy::SecretString::from("sk_test_unit".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_session_url_escapes_id() {
        let client = client();

        assert_eq!(
            client.session_url("cs_test_a1"),
            "https://api.stripe.test/v1/checkout/sessions/cs_test_a1"
        );
        assert_eq!(
            client.session_url("x/../../customers?limit=100"),
            "https://api.stripe.test/v1/checkout/sessions/x%2F..%2F..%2Fcustomers%3Flimit%3D100"
        );
    }

    #[test]
    fn test_encode_omits_absent_email() {
        let mut request = request();
        request.customer_email = None;
        request.metadata.clear();
        let form = encode_session_form(&request);

        assert!(field(&form, "customer_email").is_none());
        assert!(!form.iter().any(|(k, _)| k.starts_with("metadata")));
    }
}
