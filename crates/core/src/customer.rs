//! Customer details collected by the local checkout form.

use serde::{Deserialize, Serialize};

use crate::types::{CountryCode, Email, EmailError, UnsupportedCountry};

/// A customer field failed validation. Checkout halts until it is fixed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The email address is malformed.
    #[error("Please enter a valid email address")]
    Email(#[from] EmailError),
    /// The country is outside the shipping allow-list.
    #[error("{0}")]
    Country(#[from] UnsupportedCountry),
}

/// Raw checkout form input, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country: String,
}

/// Validated customer details.
///
/// Serialises with the same field names as [`CustomerForm`], and
/// deserialising re-runs validation, so a `CustomerInfo` received over the
/// wire is as trustworthy as one built locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomerForm")]
pub struct CustomerInfo {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: CountryCode,
}

impl CustomerInfo {
    /// Validate a submitted form.
    ///
    /// Fields are checked in form order and the first problem is reported.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing or invalid field.
    pub fn from_form(form: &CustomerForm) -> Result<Self, ValidationError> {
        let email = Email::parse(&form.email)?;
        let first_name = required(&form.first_name, "First name")?;
        let last_name = required(&form.last_name, "Last name")?;
        let address = required(&form.address, "Address")?;
        let city = required(&form.city, "City")?;
        let state = required(&form.state, "State")?;
        let zip = required(&form.zip, "ZIP code")?;
        let country = required(&form.country, "Country")?.parse()?;

        Ok(Self {
            email,
            first_name,
            last_name,
            address,
            city,
            state,
            zip,
            country,
        })
    }

    /// `"First Last"`, as printed on the shipping label.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl TryFrom<CustomerForm> for CustomerInfo {
    type Error = ValidationError;

    fn try_from(form: CustomerForm) -> Result<Self, Self::Error> {
        Self::from_form(&form)
    }
}

impl From<&CustomerInfo> for CustomerForm {
    fn from(info: &CustomerInfo) -> Self {
        Self {
            email: info.email.to_string(),
            first_name: info.first_name.clone(),
            last_name: info.last_name.clone(),
            address: info.address.clone(),
            city: info.city.clone(),
            state: info.state.clone(),
            zip: info.zip.clone(),
            country: info.country.code().to_owned(),
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_form() -> CustomerForm {
        CustomerForm {
            email: "ada@example.com".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            address: "12 St James's Square".to_owned(),
            city: "London".to_owned(),
            state: "LND".to_owned(),
            zip: "SW1Y 4JH".to_owned(),
            country: "GB".to_owned(),
        }
    }

    #[test]
    fn test_valid_form() {
        let info = CustomerInfo::from_form(&valid_form()).unwrap();
        assert_eq!(info.country, CountryCode::GB);
        assert_eq!(info.full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_missing_field_reported_in_form_order() {
        let form = CustomerForm {
            city: " ".to_owned(),
            zip: String::new(),
            ..valid_form()
        };
        assert_eq!(
            CustomerInfo::from_form(&form).unwrap_err(),
            ValidationError::Missing("City")
        );
    }

    #[test]
    fn test_invalid_email() {
        let form = CustomerForm {
            email: "ada".to_owned(),
            ..valid_form()
        };
        assert!(matches!(
            CustomerInfo::from_form(&form),
            Err(ValidationError::Email(_))
        ));
    }

    #[test]
    fn test_country_outside_allow_list() {
        let form = CustomerForm {
            country: "FR".to_owned(),
            ..valid_form()
        };
        assert!(matches!(
            CustomerInfo::from_form(&form),
            Err(ValidationError::Country(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_revalidates() {
        let info = CustomerInfo::from_form(&valid_form()).unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["country"], "GB");
        assert_eq!(json["email"], "ada@example.com");
        let back: CustomerInfo = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, info);

        let mut broken = json;
        broken["first_name"] = serde_json::Value::String(String::new());
        assert!(serde_json::from_value::<CustomerInfo>(broken).is_err());
    }
}
