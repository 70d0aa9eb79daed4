//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Prices cannot be negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// Prices are stored as `NUMERIC(8, 2)`.
    #[error("price {0} exceeds the maximum of 999999.99")]
    TooLarge(Decimal),
}

/// A menu price in rubles, rounded to kopecks.
///
/// Serialized as a string (`"350.00"`) so clients never see float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Largest value that fits the `NUMERIC(8, 2)` column.
    pub const MAX: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

    /// Create a new price, rounding to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or does not fit `NUMERIC(8, 2)`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        let amount = amount.round_dp(2);
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rounds_to_kopecks() {
        let price = Price::new(Decimal::new(35_004, 3)).unwrap();
        assert_eq!(price.amount(), Decimal::new(35_00, 2));
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::new(-1, 0)),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_rejects_too_large() {
        assert!(matches!(
            Price::new(Decimal::new(1_000_000, 0)),
            Err(PriceError::TooLarge(_))
        ));
        assert!(Price::new(Price::MAX).is_ok());
    }


    #[test]
    fn test_serializes_as_string() {
        let price = Price::new(Decimal::new(350_00, 2)).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"350.00\"");
    }
}
