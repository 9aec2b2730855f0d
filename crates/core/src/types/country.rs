//! Shipping destinations the store accepts.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// ISO 3166-1 alpha-2 codes of the countries the store ships to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CountryCode {
    #[default]
    US,
    CA,
    GB,
    AU,
}

/// Error returned for a country outside the shipping allow-list.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("we do not ship to '{0}'")]
pub struct UnsupportedCountry(pub String);

impl CountryCode {
    /// Every supported destination, in the order shown to shoppers.
    pub const ALL: [Self; 4] = [Self::US, Self::CA, Self::GB, Self::AU];

    /// Two-letter code, e.g. `"GB"`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::US => "US",
            Self::CA => "CA",
            Self::GB => "GB",
            Self::AU => "AU",
        }
    }

    /// English display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::US => "United States",
            Self::CA => "Canada",
            Self::GB => "United Kingdom",
            Self::AU => "Australia",
        }
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CountryCode {
    type Err = UnsupportedCountry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| UnsupportedCountry(code.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allow_list() {
        assert_eq!("gb".parse::<CountryCode>().unwrap(), CountryCode::GB);
        assert_eq!(" AU ".parse::<CountryCode>().unwrap(), CountryCode::AU);
        assert!("DE".parse::<CountryCode>().is_err());
    }

    #[test]
    fn test_serde_uses_code() {
        assert_eq!(serde_json::to_string(&CountryCode::CA).unwrap(), "\"CA\"");
    }
}
