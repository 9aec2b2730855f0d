//! Checkout handoff payloads and the checkout-attempt state machine.
//!
//! Nothing here performs I/O. The storefront turns these values into calls
//! against the payment provider or the relay endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::customer::CustomerInfo;
use crate::types::{CountryCode, Email, FulfillmentVariantId};

/// Metadata key holding the serialised [`CustomerInfo`] on a payment session.
pub const METADATA_CUSTOMER_INFO: &str = "customer_info";

/// Metadata key holding the fulfillment variant references of the cart.
///
/// Carts too long for one value continue in `cart_items_1`, `cart_items_2`
/// and so on.
pub const METADATA_CART_ITEMS: &str = "cart_items";

/// Longest metadata value the payment provider accepts, in characters.
pub const METADATA_VALUE_LIMIT: usize = 500;

/// Most metadata keys spent on cart items. The provider allows 50 keys.
const METADATA_CART_KEYS_LIMIT: usize = 40;

/// Checkout was requested with nothing in the cart.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Your cart is empty")]
pub struct EmptyCartError;

/// A cart line cannot be sent to the fulfillment provider.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} cannot be fulfilled right now")]
pub struct UnfulfillableLine(pub String);

/// Session metadata could not be built.
#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    /// A line has no fulfillment reference.
    #[error(transparent)]
    Unfulfillable(#[from] UnfulfillableLine),

    /// The customer details do not fit in one metadata value.
    #[error("Customer details are too long")]
    CustomerTooLong,

    /// The cart does not fit in the metadata the provider allows.
    #[error("Too many items for one order")]
    TooManyItems,

    /// A value could not be serialised.
    #[error("metadata serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Payment page mode. The store only takes one-off payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    #[default]
    Payment,
}

impl CheckoutMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
        }
    }
}

/// One line on the hosted payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub images: Vec<String>,
    pub unit_amount_minor_units: i64,
    pub quantity: u32,
}

impl From<&CartLine> for LineItem {
    fn from(line: &CartLine) -> Self {
        Self {
            name: line.label(),
            images: if line.image.is_empty() {
                Vec::new()
            } else {
                vec![line.image.clone()]
            },
            unit_amount_minor_units: line.price.to_minor_units(),
            quantity: 1,
        }
    }
}

/// Request for a hosted payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedCheckoutRequest {
    pub line_items: Vec<LineItem>,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub allowed_shipping_countries: Vec<CountryCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<Email>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl HostedCheckoutRequest {
    /// Build a request with one line item per cart line.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCartError`] when `lines` is empty.
    pub fn for_lines(
        lines: &[CartLine],
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Result<Self, EmptyCartError> {
        if lines.is_empty() {
            return Err(EmptyCartError);
        }

        Ok(Self {
            line_items: lines.iter().map(LineItem::from).collect(),
            mode: CheckoutMode::Payment,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            allowed_shipping_countries: CountryCode::ALL.to_vec(),
            customer_email: None,
            metadata: BTreeMap::new(),
        })
    }

    /// Attach the customer and the data the relay needs after payment.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Unfulfillable`] if a line has no fulfillment
    /// reference, and [`MetadataError::CustomerTooLong`] or
    /// [`MetadataError::TooManyItems`] if the data exceeds the provider's
    /// metadata limits.
    pub fn with_customer(
        mut self,
        customer: &CustomerInfo,
        lines: &[CartLine],
    ) -> Result<Self, MetadataError> {
        let variants = fulfillment_variants(lines)?;

        let customer_json = serde_json::to_string(customer)?;
        if customer_json.chars().count() > METADATA_VALUE_LIMIT {
            return Err(MetadataError::CustomerTooLong);
        }

        self.customer_email = Some(customer.email.clone());
        self.metadata
            .insert(METADATA_CUSTOMER_INFO.to_owned(), customer_json);
        for (index, chunk) in cart_item_chunks(&variants)?.into_iter().enumerate() {
            self.metadata.insert(cart_items_key(index), chunk);
        }
        Ok(self)
    }

    /// Sum of all line amounts in minor units.
    #[must_use]
    pub fn total_minor_units(&self) -> i64 {
        self.line_items
            .iter()
            .map(|item| item.unit_amount_minor_units * i64::from(item.quantity))
            .sum()
    }
}

/// Fulfillment references of every line, in cart order.
///
/// # Errors
///
/// Returns [`UnfulfillableLine`] naming the first line without a reference.
pub fn fulfillment_variants(
    lines: &[CartLine],
) -> Result<Vec<FulfillmentVariantId>, UnfulfillableLine> {
    lines
        .iter()
        .map(|line| {
            line.fulfillment_id
                .clone()
                .ok_or_else(|| UnfulfillableLine(line.label()))
        })
        .collect()
}

fn cart_items_key(index: usize) -> String {
    if index == 0 {
        METADATA_CART_ITEMS.to_owned()
    } else {
        format!("{METADATA_CART_ITEMS}_{index}")
    }
}

/// Split variant references into JSON arrays that each fit one metadata value.
fn cart_item_chunks(variants: &[FulfillmentVariantId]) -> Result<Vec<String>, MetadataError> {
    let mut chunks = Vec::new();
    let mut current: Vec<&FulfillmentVariantId> = Vec::new();
    let mut current_json = String::from("[]");

    for variant in variants {
        current.push(variant);
        let json = serde_json::to_string(&current)?;
        if json.chars().count() <= METADATA_VALUE_LIMIT {
            current_json = json;
            continue;
        }

        current.pop();
        if current.is_empty() {
            return Err(MetadataError::TooManyItems);
        }
        chunks.push(std::mem::take(&mut current_json));
        current = vec![variant];
        current_json = serde_json::to_string(&current)?;
    }
    chunks.push(current_json);

    if chunks.len() > METADATA_CART_KEYS_LIMIT {
        return Err(MetadataError::TooManyItems);
    }
    Ok(chunks)
}

/// Read back the variant references written by
/// [`HostedCheckoutRequest::with_customer`].
///
/// Returns `Ok(None)` when the metadata carries no cart items.
///
/// # Errors
///
/// Returns an error if a stored value is not a JSON array of references.
pub fn read_cart_items(
    metadata: &BTreeMap<String, String>,
) -> Result<Option<Vec<FulfillmentVariantId>>, serde_json::Error> {
    let mut variants = Vec::new();
    let mut found = false;

    for index in 0.. {
        let Some(raw) = metadata.get(&cart_items_key(index)) else {
            break;
        };
        found = true;
        variants.extend(serde_json::from_str::<Vec<FulfillmentVariantId>>(raw)?);
    }

    Ok(found.then_some(variants))
}

/// Body of the relay's `create-checkout-session` call.
///
/// Only `product_id` and `size` of each item are trusted. The relay reprices
/// every line from its own catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySessionRequest {
    pub items: Vec<CartLine>,
    pub customer: CustomerInfo,
}

/// A hosted payment session opened by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Opaque session identifier.
    pub id: String,
    /// Hosted payment page to send the shopper to.
    pub url: String,
}

/// Body of the relay's `payment-success` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmationRequest {
    pub session_id: String,
}

/// Successful `payment-success` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub success: bool,
    pub message: String,
}

/// Error body returned by relay endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
}

/// Payment status reported by the provider for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Progress of a single checkout attempt.
///
/// ```text
/// Idle -> CollectingCustomerInfo -> RequestingSession -> RedirectedToPayment
///      \________________________/                      -> PaymentConfirmed
///       (hosted backend skips the form)                 -> PaymentCancelled
///                                                       -> PaymentFailed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Idle,
    CollectingCustomerInfo,
    RequestingSession,
    RedirectedToPayment {
        session_id: String,
    },
    PaymentConfirmed,
    PaymentCancelled,
    PaymentFailed,
}

/// Inputs that drive [`CheckoutState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutEvent {
    /// Shopper pressed checkout with a non-empty cart.
    Begin { needs_customer_form: bool },
    /// The local customer form passed validation.
    CustomerSubmitted,
    /// The payment session was opened.
    SessionCreated { session_id: String },
    /// Opening the payment session failed; the shopper may retry.
    SessionFailed,
    /// The shopper came back to the success page and payment was confirmed.
    Confirmed,
    /// The shopper came back to the cancel page.
    Cancelled,
    /// Confirmation after payment reported an error.
    Failed,
}

/// An event arrived in a state that does not accept it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot apply {event:?} while {state:?}")]
pub struct CheckoutStateError {
    pub state: CheckoutState,
    pub event: CheckoutEvent,
}

impl CheckoutState {
    /// Terminal states are only left by starting a new attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PaymentConfirmed | Self::PaymentCancelled | Self::PaymentFailed
        )
    }

    /// Session id of the payment page the shopper was sent to, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::RedirectedToPayment { session_id } => Some(session_id),
            _ => None,
        }
    }

    /// Apply `event`, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutStateError`] for transitions the flow does not allow;
    /// the current state is returned inside the error untouched.
    pub fn apply(self, event: CheckoutEvent) -> Result<Self, CheckoutStateError> {
        use CheckoutEvent as E;

        match (self, event) {
            (state, E::Begin { needs_customer_form }) if state != Self::RequestingSession => {
                Ok(if needs_customer_form {
                    Self::CollectingCustomerInfo
                } else {
                    Self::RequestingSession
                })
            }
            (Self::CollectingCustomerInfo, E::CustomerSubmitted) => Ok(Self::RequestingSession),
            (Self::RequestingSession, E::SessionCreated { session_id }) => {
                Ok(Self::RedirectedToPayment { session_id })
            }
            (Self::RequestingSession, E::SessionFailed) => Ok(Self::Idle),
            (Self::RedirectedToPayment { .. }, E::Confirmed) => Ok(Self::PaymentConfirmed),
            (Self::RedirectedToPayment { .. }, E::Cancelled) => Ok(Self::PaymentCancelled),
            (Self::RedirectedToPayment { .. }, E::Failed) => Ok(Self::PaymentFailed),
            (state, event) => Err(CheckoutStateError { state, event }),
        }
    }
}
