//! Card and billing address data.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Card details handed to the provider.
///
/// The expiry year is always four digits: a two-digit year `YY` becomes
/// `20YY`. An empty CVN is treated as absent, and whether a CVN is present
/// decides which charge variant the provider is asked for.
#[derive(Clone, PartialEq, Eq)]
pub struct CardData {
    number: String,
    exp_month: String,
    exp_year: String,
    cvn: Option<String>,
}

impl CardData {
    /// Builds card data, expanding the expiry year.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the expiry year is neither two nor four
    /// ASCII digits.
    pub fn new(
        number: impl Into<String>,
        exp_month: impl Into<String>,
        exp_year: &str,
        cvn: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            number: number.into(),
            exp_month: exp_month.into(),
            exp_year: expand_year(exp_year)?,
            cvn: cvn.filter(|c| !c.is_empty()),
        })
    }

    /// The primary account number.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// The expiry month as supplied.
    #[must_use]
    pub fn exp_month(&self) -> &str {
        &self.exp_month
    }

    /// The four-digit expiry year.
    #[must_use]
    pub fn exp_year(&self) -> &str {
        &self.exp_year
    }

    /// The card verification number, if one was supplied.
    #[must_use]
    pub fn cvn(&self) -> Option<&str> {
        self.cvn.as_deref()
    }

    /// The last four characters of the card number.
    #[must_use]
    pub fn last4(&self) -> &str {
        let start = self
            .number
            .char_indices()
            .rev()
            .nth(3)
            .map_or(0, |(idx, _)| idx);
        &self.number[start..]
    }
}

impl fmt::Debug for CardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardData")
            .field("number", &format_args!("****{}", self.last4()))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvn", &self.cvn.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Expands a two-digit expiry year to four digits.
fn expand_year(year: &str) -> Result<String, ValidationError> {
    let year = year.trim();
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("expYear", format!("`{year}` is not a year")));
    }
    match year.len() {
        2 => Ok(format!("20{year}")),
        4 => Ok(year.to_owned()),
        _ => Err(ValidationError::new(
            "expYear",
            format!("expected two digits, got `{year}`"),
        )),
    }
}

/// Billing address used for verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// First street line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_address1: Option<String>,
    /// Postal or zip code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Address {
    /// Creates an address from an optional street line and postal code.
    #[must_use]
    pub const fn new(street: Option<String>, postal_code: Option<String>) -> Self {
        Self {
            street_address1: street,
            postal_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_digit_year_is_prefixed() {
        for yy in ["00", "07", "25", "99"] {
            let card = CardData::new("4111111111111111", "12", yy, None).unwrap();
            assert_eq!(card.exp_year(), format!("20{yy}"));
        }
    }

    #[test]
    fn test_four_digit_year_is_kept() {
        let card = CardData::new("4111111111111111", "12", "2031", None).unwrap();
        assert_eq!(card.exp_year(), "2031");
    }

    #[test]
    fn test_malformed_year_is_rejected() {
        assert!(CardData::new("4111111111111111", "12", "None", None).is_err());
        assert!(CardData::new("4111111111111111", "12", "203", None).is_err());
    }

    #[test]
    fn test_empty_cvn_is_absent() {
        let card = CardData::new("4111111111111111", "12", "30", Some(String::new())).unwrap();
        assert_eq!(card.cvn(), None);
        let card = CardData::new("4111111111111111", "12", "30", Some("123".into())).unwrap();
        assert_eq!(card.cvn(), Some("123"));
    }

    #[test]
    fn test_debug_hides_number_and_cvn() {
        let card = CardData::new("4111111111111111", "12", "30", Some("123".into())).unwrap();
        let debug = format!("{card:?}");
        assert!(debug.contains("****1111"));
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("123"));
    }

    #[test]
    fn test_last4_of_short_number() {
        let card = CardData::new("42", "12", "30", None).unwrap();
        assert_eq!(card.last4(), "42");
    }
}
