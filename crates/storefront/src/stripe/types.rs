//! Stripe API response types.
//!
//! Only the fields the store reads are modelled; everything else in the
//! payload is ignored.

use std::collections::BTreeMap;

use psychosis_core::checkout::PaymentStatus;
use psychosis_core::fulfillment::ShippingAddress;
use serde::Deserialize;

use super::SessionDetails;

/// A Checkout Session object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Legacy location of the collected address.
    #[serde(default)]
    pub shipping_details: Option<StripeShippingDetails>,
    /// Location of the collected address on current API versions.
    #[serde(default)]
    pub collected_information: Option<StripeCollectedInformation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCollectedInformation {
    #[serde(default)]
    pub shipping_details: Option<StripeShippingDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeShippingDetails {
    #[serde(default)]
    pub name: Option<String>,
    pub address: StripeAddress,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl From<&StripeShippingDetails> for ShippingAddress {
    fn from(details: &StripeShippingDetails) -> Self {
        let address = &details.address;
        Self {
            name: details.name.clone().unwrap_or_default(),
            line1: address.line1.clone().unwrap_or_default(),
            line2: address.line2.clone().filter(|l| !l.is_empty()),
            city: address.city.clone().unwrap_or_default(),
            state: address.state.clone().unwrap_or_default(),
            postal_code: address.postal_code.clone().unwrap_or_default(),
            country: address.country.clone().unwrap_or_default(),
        }
    }
}

impl From<StripeCheckoutSession> for SessionDetails {
    fn from(session: StripeCheckoutSession) -> Self {
        let shipping = session
            .collected_information
            .as_ref()
            .and_then(|info| info.shipping_details.as_ref())
            .or(session.shipping_details.as_ref())
            .map(ShippingAddress::from);

        Self {
            id: session.id,
            payment_status: session.payment_status,
            shipping,
            metadata: session.metadata,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_paid_session_with_legacy_shipping() {
        let session: StripeCheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": "paid",
            "url": null,
            "metadata": {"customer_info": "{}"},
            "shipping_details": {
                "name": "Ada Lovelace",
                "address": {
                    "line1": "12 St James's Square",
                    "line2": "",
                    "city": "London",
                    "state": null,
                    "postal_code": "SW1Y 4JH",
                    "country": "GB"
                }
            }
        }))
        .unwrap();

        let details = SessionDetails::from(session);
        assert!(details.payment_status.is_paid());
        let shipping = details.shipping.unwrap();
        assert_eq!(shipping.name, "Ada Lovelace");
        assert_eq!(shipping.line2, None);
        assert_eq!(shipping.state, "");
        assert_eq!(shipping.country, "GB");
        assert_eq!(details.metadata.len(), 1);
    }

    #[test]
    fn test_collected_information_wins() {
        let session: StripeCheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_2",
            "payment_status": "paid",
            "shipping_details": {"name": "Old", "address": {"country": "US"}},
            "collected_information": {
                "shipping_details": {"name": "New", "address": {"country": "CA"}}
            }
        }))
        .unwrap();

        let shipping = SessionDetails::from(session).shipping.unwrap();
        assert_eq!(shipping.name, "New");
        assert_eq!(shipping.country, "CA");
    }

    #[test]
    fn test_unknown_payment_status() {
        let session: StripeCheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_3",
            "payment_status": "processing"
        }))
        .unwrap();

        assert_eq!(session.payment_status, PaymentStatus::Unknown);
        assert!(SessionDetails::from(session).shipping.is_none());
    }
}
