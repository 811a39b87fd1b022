//! Monetary amounts.
//!
//! Amounts are carried as [`Decimal`] so that `"10.00"` and `10` compare equal
//! when deciding between a void and a partial refund. The currency is never
//! taken from the caller; the orchestrator injects the configured default.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A decimal amount paired with a currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount, serialized as a decimal string.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl Money {
    /// Creates a new amount in `currency`.
    #[must_use]
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Parses a caller-supplied textual amount such as `"10.00"`.
///
/// # Errors
///
/// Returns [`ValidationError`] naming `field` if the text is not a decimal
/// number.
pub fn parse_amount(field: &str, text: &str) -> Result<Decimal, ValidationError> {
    Decimal::from_str(text.trim())
        .map_err(|e| ValidationError::new(field, format!("`{text}` is not a decimal amount ({e})")))
}
