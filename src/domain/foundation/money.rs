//! Money and currency value objects.
//!
//! All amounts are held as `i64` minor units (cents, paise) tagged with their
//! currency. Decimal text from forms is converted once at the boundary via
//! [`Money::from_major`]; gateways receive [`Money::minor_units`] unchanged.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Basis points in one whole (100%).
pub const BASIS_POINTS_PER_UNIT: i64 = 10_000;

/// ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a three-letter code, case-insensitively.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                "must be a three-letter ISO code",
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn inr() -> Self {
        Self("INR".to_string())
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Upper-case code, e.g. `INR`.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal digits in the currency's minor unit.
    pub fn minor_unit_exponent(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" | "VND" | "CLP" | "ISK" | "UGX" | "XAF" | "XOF" => 0,
            "BHD" | "KWD" | "OMR" | "JOD" | "TND" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// An amount of money in minor units of a single currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Converts a major-unit decimal (`1000.00`) into minor units.
    ///
    /// Rejects values with more fractional digits than the currency allows
    /// and values that overflow `i64` minor units.
    pub fn from_major(amount: Decimal, currency: Currency) -> Result<Self, ValidationError> {
        let exponent = currency.minor_unit_exponent();
        let scaled = amount
            .checked_mul(Decimal::from(10_i64.pow(exponent)))
            .ok_or_else(|| ValidationError::invalid_format("amount", "amount is too large"))?;
        if !scaled.fract().is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                format!(
                    "{} allows at most {} decimal places",
                    currency.code(),
                    exponent
                ),
            ));
        }
        let minor_units = scaled
            .to_i64()
            .ok_or_else(|| ValidationError::invalid_format("amount", "amount is too large"))?;
        Ok(Self::from_minor(minor_units, currency))
    }

    /// Parses decimal text such as `"1000.00"`.
    pub fn parse_major(amount: &str, currency: Currency) -> Result<Self, ValidationError> {
        let trimmed = amount.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("amount"));
        }
        let decimal = Decimal::from_str(trimmed)
            .map_err(|e| ValidationError::invalid_format("amount", e.to_string()))?;
        Self::from_major(decimal, currency)
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Major-unit decimal with the currency's scale, e.g. `1180.00`.
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.minor_units, self.currency.minor_unit_exponent())
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    /// Applies a rate in basis points, rounding half away from zero to the
    /// nearest minor unit.
    pub fn percentage(&self, basis_points: i64) -> Money {
        let product = self.minor_units as i128 * basis_points as i128;
        let divisor = BASIS_POINTS_PER_UNIT as i128;
        let half = divisor / 2;
        let rounded = if product >= 0 {
            (product + half) / divisor
        } else {
            (product - half) / divisor
        };
        Self::from_minor(rounded as i64, self.currency.clone())
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> Result<Money, ValidationError> {
        self.ensure_same_currency(other)?;
        let sum = self
            .minor_units
            .checked_add(other.minor_units)
            .ok_or_else(|| ValidationError::invalid_format("amount", "amount is too large"))?;
        Ok(Self::from_minor(sum, self.currency.clone()))
    }

    /// Subtracts an amount of the same currency.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, ValidationError> {
        self.ensure_same_currency(other)?;
        let diff = self
            .minor_units
            .checked_sub(other.minor_units)
            .ok_or_else(|| ValidationError::invalid_format("amount", "amount is too large"))?;
        Ok(Self::from_minor(diff, self.currency.clone()))
    }

    pub fn ensure_same_currency(&self, other: &Money) -> Result<(), ValidationError> {
        if self.currency != other.currency {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected {}, got {}", self.currency, other.currency),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_major(), self.currency)
    }
}
