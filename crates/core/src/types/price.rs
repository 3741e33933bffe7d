//! Currency codes and minor-unit conversion using decimal arithmetic.
//!
//! Catalog prices are stored in major units (pounds, dollars). Stripe works
//! in integer minor units (pence, cents). Conversions in both directions go
//! through [`major_to_minor`] and [`minor_to_major`] so the two
//! representations never mix.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors converting prices between representations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount does not fit in an `i64` of minor units.
    #[error("price {0} is out of range for minor units")]
    OutOfRange(Decimal),
    /// Unrecognised ISO 4217 code.
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
}

/// Convert a major-unit amount into minor units (`round(amount * 100)`).
///
/// # Errors
///
/// Returns [`PriceError::OutOfRange`] if the result overflows `i64`.
pub fn major_to_minor(amount: Decimal) -> Result<i64, PriceError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .ok_or(PriceError::OutOfRange(amount))
}

/// Convert minor units back into a major-unit amount (`minor / 100`).
///
/// ```
/// use basketry_core::minor_to_major;
/// use rust_decimal::Decimal;
///
/// assert_eq!(minor_to_major(1999), Decimal::new(1999, 2));
/// ```
#[must_use]
pub fn minor_to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// ISO 4217 currency codes accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    GBP,
    USD,
    EUR,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Lowercase code as Stripe expects it in `price_data[currency]`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GBP => "gbp",
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gbp" => Ok(Self::GBP),
            "usd" => Ok(Self::USD),
            "eur" => Ok(Self::EUR),
            "cad" => Ok(Self::CAD),
            "aud" => Ok(Self::AUD),
            _ => Err(PriceError::UnsupportedCurrency(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_major_to_minor_exact() {
        assert_eq!(major_to_minor(Decimal::new(1999, 2)).unwrap(), 1999);
        assert_eq!(major_to_minor(Decimal::from(5)).unwrap(), 500);
    }

    #[test]
    fn test_major_to_minor_rounds_to_nearest() {
        // 10.005 -> 1000.5 -> 1001
        assert_eq!(major_to_minor(Decimal::new(10005, 3)).unwrap(), 1001);
        // 10.004 -> 1000.4 -> 1000
        assert_eq!(major_to_minor(Decimal::new(10004, 3)).unwrap(), 1000);
        // 0.125 -> 12.5 -> 13
        assert_eq!(major_to_minor(Decimal::new(125, 3)).unwrap(), 13);
    }

    #[test]
    fn test_major_to_minor_out_of_range() {
        assert!(matches!(
            major_to_minor(Decimal::MAX),
            Err(PriceError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_minor_to_major() {
        assert_eq!(minor_to_major(4550), Decimal::new(4550, 2));
        assert_eq!(minor_to_major(0), Decimal::ZERO);
    }

    #[test]
    fn test_currency_code_parse() {
        assert_eq!("GBP".parse::<CurrencyCode>().unwrap(), CurrencyCode::GBP);
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert!(matches!(
            "xyz".parse::<CurrencyCode>(),
            Err(PriceError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_currency_code_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&CurrencyCode::EUR).unwrap(),
            "\"eur\""
        );
        assert_eq!(CurrencyCode::GBP.to_string(), "gbp");
    }
}
