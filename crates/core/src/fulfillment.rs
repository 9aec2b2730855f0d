//! Print-on-demand order payloads.
//!
//! Orders are only ever placed by the relay after the payment provider has
//! reported a session as paid.

use serde::{Deserialize, Serialize, Serializer};

use crate::customer::CustomerInfo;
use crate::types::FulfillmentVariantId;

/// Shipping service requested from the fulfillment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingMethod {
    #[default]
    Standard,
}

/// A postal address collected by the payment provider's hosted page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Who the parcel goes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address2: String,
    pub city: String,
    pub state_code: String,
    pub country_code: String,
    pub zip: String,
}

impl From<&CustomerInfo> for Recipient {
    fn from(customer: &CustomerInfo) -> Self {
        Self {
            name: customer.full_name(),
            address1: customer.address.clone(),
            address2: String::new(),
            city: customer.city.clone(),
            state_code: customer.state.clone(),
            country_code: customer.country.code().to_owned(),
            zip: customer.zip.clone(),
        }
    }
}

impl From<&ShippingAddress> for Recipient {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            name: address.name.clone(),
            address1: address.line1.clone(),
            address2: address.line2.clone().unwrap_or_default(),
            city: address.city.clone(),
            state_code: address.state.clone(),
            country_code: address.country.clone(),
            zip: address.postal_code.clone(),
        }
    }
}

/// One garment in a fulfillment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FulfillmentItem {
    /// Provider variant; numeric references are sent as JSON numbers.
    #[serde(serialize_with = "serialize_variant_id")]
    pub variant_id: FulfillmentVariantId,
    pub quantity: u32,
}

/// Order-creation request sent to the fulfillment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FulfillmentOrder {
    /// Our reference for the order: the paid payment session id.
    pub external_id: String,
    pub shipping: ShippingMethod,
    pub recipient: Recipient,
    pub items: Vec<FulfillmentItem>,
}

impl FulfillmentOrder {
    /// One item of quantity one per cart line.
    #[must_use]
    pub fn new(
        external_id: impl Into<String>,
        recipient: Recipient,
        variants: &[FulfillmentVariantId],
    ) -> Self {
        Self {
            external_id: external_id.into(),
            shipping: ShippingMethod::Standard,
            recipient,
            items: variants
                .iter()
                .map(|variant_id| FulfillmentItem {
                    variant_id: variant_id.clone(),
                    quantity: 1,
                })
                .collect(),
        }
    }
}

fn serialize_variant_id<S: Serializer>(
    id: &FulfillmentVariantId,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match id.as_str().parse::<u64>() {
        Ok(numeric) => serializer.serialize_u64(numeric),
        Err(_) => serializer.serialize_str(id.as_str()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::customer::tests::valid_form;

    #[test]
    fn test_order_wire_shape() {
        let customer = CustomerInfo::from_form(&valid_form()).unwrap();
        let order = FulfillmentOrder::new(
            "cs_test_123",
            Recipient::from(&customer),
            &[
                FulfillmentVariantId::new("4012"),
                FulfillmentVariantId::new("tee_m"),
            ],
        );

        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            json!({
                "external_id": "cs_test_123",
                "shipping": "STANDARD",
                "recipient": {
                    "name": "Ada Lovelace",
                    "address1": "12 St James's Square",
                    "city": "London",
                    "state_code": "LND",
                    "country_code": "GB",
                    "zip": "SW1Y 4JH"
                },
                "items": [
                    { "variant_id": 4012, "quantity": 1 },
                    { "variant_id": "tee_m", "quantity": 1 }
                ]
            })
        );
    }

    #[test]
    fn test_recipient_from_collected_address() {
        let address = ShippingAddress {
            name: "Grace Hopper".to_owned(),
            line1: "1 Navy Way".to_owned(),
            line2: Some("Apt 2".to_owned()),
            city: "Arlington".to_owned(),
            state: "VA".to_owned(),
            postal_code: "22202".to_owned(),
            country: "US".to_owned(),
        };
        let recipient = Recipient::from(&address);
        assert_eq!(recipient.address2, "Apt 2");
        assert_eq!(recipient.state_code, "VA");
        assert_eq!(recipient.zip, "22202");
    }
}
