//! Relay between the browser, the payment provider and the fulfillment
//! provider.
//!
//! The relay opens hosted payment sessions carrying everything needed to
//! place the fulfillment order later, and places that order only after the
//! payment provider reports the session as paid. Submitted items are
//! repriced from the catalog; client-supplied prices and names are ignored.

use std::sync::Arc;

use psychosis_core::checkout::{
    CheckoutSession, Confirmation, EmptyCartError, HostedCheckoutRequest, METADATA_CART_ITEMS,
    METADATA_CUSTOMER_INFO, MetadataError, PaymentStatus, RelaySessionRequest, UnfulfillableLine,
    read_cart_items,
};
use psychosis_core::fulfillment::{FulfillmentOrder, Recipient};
use psychosis_core::{Cart, CartLine, CustomerInfo};
use thiserror::Error;
use tracing::instrument;

use super::CatalogService;
use crate::printful::{FulfillmentProvider, PlacedOrder, PrintfulError};
use crate::stripe::{PaymentGateway, SessionDetails, StripeError};

/// Message returned once the fulfillment order is placed.
pub const ORDER_CREATED_MESSAGE: &str = "Order created successfully";

/// Errors raised by the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request carried no items.
    #[error("No items to check out")]
    EmptyItems,

    /// An item is not sold in the requested size.
    #[error("{0} is not available")]
    UnknownItem(String),

    /// An item cannot be sent to the fulfillment provider.
    #[error(transparent)]
    Unfulfillable(#[from] UnfulfillableLine),

    /// The order does not fit in one payment session.
    #[error("{0}")]
    TooLarge(String),

    /// The session exists but has not been paid.
    #[error("Payment not completed")]
    NotPaid(PaymentStatus),

    /// The payment provider failed.
    #[error("Payment provider error: {0}")]
    Gateway(#[from] StripeError),

    /// The fulfillment provider failed.
    #[error("Fulfillment provider error: {0}")]
    Fulfillment(#[from] PrintfulError),

    /// No fulfillment provider is configured.
    #[error("Fulfillment provider is not configured")]
    FulfillmentUnavailable,

    /// Session metadata needed for the order is missing or unreadable.
    #[error("Session metadata error: {0}")]
    Metadata(String),
}

impl From<EmptyCartError> for RelayError {
    fn from(_: EmptyCartError) -> Self {
        Self::EmptyItems
    }
}

impl From<MetadataError> for RelayError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Unfulfillable(line) => Self::Unfulfillable(line),
            MetadataError::CustomerTooLong | MetadataError::TooManyItems => {
                Self::TooLarge(err.to_string())
            }
            MetadataError::Serialize(e) => Self::Metadata(e.to_string()),
        }
    }
}

impl RelayError {
    /// Problems with the submitted request rather than upstream failures.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::EmptyItems | Self::UnknownItem(_) | Self::Unfulfillable(_) | Self::TooLarge(_)
        )
    }
}

/// Server-side relay service.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayServiceInner>,
}

struct RelayServiceInner {
    catalog: CatalogService,
    gateway: Arc<dyn PaymentGateway>,
    fulfillment: Option<Arc<dyn FulfillmentProvider>>,
    success_url: String,
    cancel_url: String,
}

impl RelayService {
    #[must_use]
    pub fn new(
        catalog: CatalogService,
        gateway: Arc<dyn PaymentGateway>,
        fulfillment: Option<Arc<dyn FulfillmentProvider>>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RelayServiceInner {
                catalog,
                gateway,
                fulfillment,
                success_url: success_url.into(),
                cancel_url: cancel_url.into(),
            }),
        }
    }

    /// Open a hosted payment session for the submitted cart and customer.
    ///
    /// The session carries the customer email, a shipping allow-list and
    /// metadata with the customer details and fulfillment references.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::EmptyItems`], [`RelayError::UnknownItem`],
    /// [`RelayError::Unfulfillable`] or [`RelayError::TooLarge`] for bad
    /// input, or [`RelayError::Gateway`] if the provider fails.
    #[instrument(skip_all, fields(items = request.items.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &RelaySessionRequest,
    ) -> Result<CheckoutSession, RelayError> {
        let lines = self.reprice(&request.items).await?;
        let hosted = HostedCheckoutRequest::for_lines(
            &lines,
            &self.inner.success_url,
            &self.inner.cancel_url,
        )?
        .with_customer(&request.customer, &lines)?;

        let session = self.inner.gateway.create_session(&hosted).await?;
        tracing::info!(session_id = %session.id, "Relay opened checkout session");
        Ok(session)
    }

    /// Rebuild submitted items from the current catalog.
    ///
    /// Each line takes the price, name, image and fulfillment reference of
    /// the catalog variant matching its product and size.
    async fn reprice(&self, items: &[CartLine]) -> Result<Vec<CartLine>, RelayError> {
        let catalog = self.inner.catalog.catalog().await;
        let mut cart = Cart::new();

        for item in items {
            let product = catalog
                .find(item.product_id)
                .ok_or_else(|| RelayError::UnknownItem(item.label()))?;
            cart.add_line(product, Some(&item.size))
                .map_err(|_| RelayError::UnknownItem(item.label()))?;
        }

        Ok(cart.lines().to_vec())
    }

    /// Confirm a paid session and place its fulfillment order.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotPaid`] if the session is not paid; no order
    /// is created in that case. Other variants report upstream failures.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, session_id: &str) -> Result<Confirmation, RelayError> {
        let session = self.inner.gateway.retrieve_session(session_id).await?;

        if !session.payment_status.is_paid() {
            tracing::warn!(status = ?session.payment_status, "Session not paid, no order placed");
            return Err(RelayError::NotPaid(session.payment_status));
        }

        let fulfillment = self
            .inner
            .fulfillment
            .as_ref()
            .ok_or(RelayError::FulfillmentUnavailable)?;

        let order = build_fulfillment_order(&session)?;
        let placed: PlacedOrder = fulfillment.create_order(&order).await?;
        tracing::info!(order_id = placed.id, "Fulfillment order placed");

        Ok(Confirmation {
            success: true,
            message: ORDER_CREATED_MESSAGE.to_owned(),
        })
    }
}

/// Build the fulfillment order for a paid session.
///
/// The recipient is the shipping address collected on the hosted page,
/// falling back to the customer details stored in metadata.
///
/// # Errors
///
/// Returns [`RelayError::Metadata`] if the cart items are missing or if
/// neither a shipping address nor valid customer details are available.
pub fn build_fulfillment_order(session: &SessionDetails) -> Result<FulfillmentOrder, RelayError> {
    let variants = read_cart_items(&session.metadata)
        .map_err(|e| RelayError::Metadata(e.to_string()))?
        .ok_or_else(|| RelayError::Metadata(format!("missing {METADATA_CART_ITEMS}")))?;

    if variants.is_empty() {
        return Err(RelayError::Metadata("no cart items".to_owned()));
    }

    let recipient = match &session.shipping {
        Some(address) => Recipient::from(address),
        None => {
            let customer: CustomerInfo = session
                .metadata
                .get(METADATA_CUSTOMER_INFO)
                .ok_or_else(|| {
                    RelayError::Metadata("no shipping address or customer details".to_owned())
                })
                .and_then(|raw| {
                    serde_json::from_str(raw).map_err(|e| RelayError::Metadata(e.to_string()))
                })?;
            Recipient::from(&customer)
        }
    };

    Ok(FulfillmentOrder::new(&session.id, recipient, &variants))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use psychosis_core::fulfillment::ShippingAddress;

    use super::*;

    fn metadata(customer: bool) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            METADATA_CART_ITEMS.to_string(),
            r#"["4012","tee_m"]"#.to_string(),
        );
        if customer {
            metadata.insert(
                METADATA_CUSTOMER_INFO.to_string(),
                serde_json::json!({
                    "email": "ada@example.com",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "address": "12 St James's Square",
                    "city": "London",
                    "state": "LND",
                    "zip": "SW1Y 4JH",
                    "country": "GB"
                })
                .to_string(),
            );
        }
        metadata
    }

    fn session(shipping: Option<ShippingAddress>, customer: bool) -> SessionDetails {
        SessionDetails {
            id: "cs_test_paid".to_string(),
            payment_status: PaymentStatus::Paid,
            shipping,
            metadata: metadata(customer),
        }
    }

    #[test]
    fn test_order_prefers_collected_shipping() {
        let shipping = ShippingAddress {
            name: "Grace Hopper".to_string(),
            line1: "1 Navy Way".to_string(),
            line2: Some("Suite 2".to_string()),
            city: "Arlington".to_string(),
            state: "VA".to_string(),
            postal_code: "22202".to_string(),
            country: "US".to_string(),
        };
        let order = build_fulfillment_order(&session(Some(shipping), true)).unwrap();

        assert_eq!(order.external_id, "cs_test_paid");
        assert_eq!(order.recipient.name, "Grace Hopper");
        assert_eq!(order.recipient.address2, "Suite 2");
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].quantity, 1);
    }

    #[test]
    fn test_order_falls_back_to_customer_metadata() {
        let order = build_fulfillment_order(&session(None, true)).unwrap();

        assert_eq!(order.recipient.name, "Ada Lovelace");
        assert_eq!(order.recipient.country_code, "GB");
        assert_eq!(order.recipient.zip, "SW1Y 4JH");
    }

    #[test]
    fn test_order_without_any_address_fails() {
        let err = build_fulfillment_order(&session(None, false)).unwrap_err();
        assert!(matches!(err, RelayError::Metadata(_)));
    }

    #[test]
    fn test_order_joins_split_cart_items() {
        let mut session = session(None, true);
        session
            .metadata
            .insert(format!("{METADATA_CART_ITEMS}_1"), r#"["hoodie_l"]"#.to_string());
        let order = build_fulfillment_order(&session).unwrap();

        assert_eq!(order.items.len(), 3);
        assert_eq!(order.items[2].variant_id.as_str(), "hoodie_l");
    }

    #[test]
    fn test_metadata_limits_are_bad_requests() {
        assert!(RelayError::from(MetadataError::TooManyItems).is_bad_request());
        assert!(RelayError::UnknownItem("Insanity Tee (XXL)".to_string()).is_bad_request());
        assert!(!RelayError::FulfillmentUnavailable.is_bad_request());

        let serialize = serde_json::from_str::<u8>("x").unwrap_err();
        let err = RelayError::from(MetadataError::Serialize(serialize));
        assert!(matches!(err, RelayError::Metadata(_)));
        assert!(!err.is_bad_request());
    }

    #[test]
    fn test_order_without_items_fails() {
        let mut session = session(None, true);
        session.metadata.remove(METADATA_CART_ITEMS);
        assert!(matches!(
            build_fulfillment_order(&session),
            Err(RelayError::Metadata(_))
        ));
    }
}
