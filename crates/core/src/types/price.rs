//! Store prices using decimal arithmetic.
//!
//! All prices are in the store currency (USD). Amounts are kept as
//! [`Decimal`] so that sums of line prices never pick up binary
//! floating-point error; conversion to the payment provider's minor units
//! happens once, at the checkout boundary.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// ISO 4217 code of the store currency, lowercase as the payment API expects.
pub const STORE_CURRENCY: &str = "usd";

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The amount exceeds the largest price the store accepts.
    #[error("price must be at most {max} (got {amount})")]
    TooLarge {
        /// The rejected amount.
        amount: Decimal,
        /// Largest accepted amount.
        max: Decimal,
    },
}

/// A non-negative amount in the store currency's standard unit (dollars).
///
/// ```
/// use std::str::FromStr;
/// use psychosis_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::from_str("19.995").unwrap()).unwrap();
/// assert_eq!(price.to_minor_units(), 2000);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest single price accepted: one million dollars.
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

    /// Create a price from a dollar amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or above [`Self::MAX_AMOUNT`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(PriceError::TooLarge {
                amount,
                max: Self::MAX_AMOUNT,
            });
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The dollar amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Convert to minor currency units (cents).
    ///
    /// Rounds half away from zero, so `19.995` becomes `2000` rather than
    /// being truncated to `1999`.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        let cents = (self.0 * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(cents.mantissa()).unwrap_or(i64::MAX)
    }

    /// Format for display, e.g. `$39.99`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("${rounded:.2}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).unwrap()).unwrap()
    }

    #[test]
    fn test_minor_units_round_half_up() {
        assert_eq!(price("19.995").to_minor_units(), 2000);
        assert_eq!(price("19.994").to_minor_units(), 1999);
        assert_eq!(price("39.99").to_minor_units(), 3999);
        assert_eq!(price("0").to_minor_units(), 0);
    }

    #[test]
    fn test_negative_rejected() {
        assert!(matches!(
            Price::new(Decimal::from_str("-0.01").unwrap()),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_too_large_rejected() {
        assert!(matches!(
            Price::new(Decimal::from_str("1000000.01").unwrap()),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(price("129.98").display(), "$129.98");
        assert_eq!(price("5").display(), "$5.00");
        assert_eq!(Price::from_cents(3999).to_string(), "$39.99");
    }

    #[test]
    fn test_sum() {
        let total: Price = [price("39.99"), price("89.99")].iter().sum();
        assert_eq!(total, price("129.98"));
    }

    #[test]
    fn test_deserialize_accepts_numbers_and_rejects_negative() {
        let parsed: Price = serde_json::from_str("39.99").unwrap();
        assert_eq!(parsed, price("39.99"));
        let parsed: Price = serde_json::from_str("\"89.99\"").unwrap();
        assert_eq!(parsed, price("89.99"));
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }
}
