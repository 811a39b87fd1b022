//! Provider responses and their flat projection.
//!
//! Callers of the facade only ever see a [`ResultMapping`]: the string fields
//! of whatever the provider returned, keyed by field name. Numeric and nested
//! fields are dropped. Each response variant lists its string fields
//! explicitly in its [`Projection`] impl.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat string-to-string view of a provider response.
pub type ResultMapping = BTreeMap<String, String>;

/// Projects a provider response onto its present string fields.
pub trait Projection {
    /// Returns the string fields that are present, keyed by field name.
    fn project(&self) -> ResultMapping;
}

/// Outcome of a charge, authorization, verification, capture, refund,
/// reversal or void.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Provider transaction identifier.
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Gateway or issuer response code.
    #[serde(default)]
    pub response_code: Option<String>,
    /// Gateway or issuer response text.
    #[serde(default)]
    pub response_message: Option<String>,
    /// Issuer authorization code.
    #[serde(default)]
    pub authorization_code: Option<String>,
    /// Processor reference number.
    #[serde(default)]
    pub reference_number: Option<String>,
    /// Echo of the client reference sent with the request.
    #[serde(default)]
    pub client_transaction_id: Option<String>,
    /// Address verification result code.
    #[serde(default)]
    pub avs_response_code: Option<String>,
    /// Address verification result text.
    #[serde(default)]
    pub avs_response_message: Option<String>,
    /// CVN verification result code.
    #[serde(default)]
    pub cvn_response_code: Option<String>,
    /// CVN verification result text.
    #[serde(default)]
    pub cvn_response_message: Option<String>,
    /// Card brand as reported by the provider.
    #[serde(default)]
    pub card_type: Option<String>,
    /// Provider timestamp in its native format.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Amount the issuer approved.
    #[serde(default)]
    pub authorized_amount: Option<Decimal>,
    /// Remaining balance on prepaid cards.
    #[serde(default)]
    pub balance_amount: Option<Decimal>,
    /// Whether the issuer approved only part of the amount.
    #[serde(default)]
    pub partial_approval: Option<bool>,
}

impl Projection for TransactionResponse {
    fn project(&self) -> ResultMapping {
        let fields = [
            ("transaction_id", &self.transaction_id),
            ("response_code", &self.response_code),
            ("response_message", &self.response_message),
            ("authorization_code", &self.authorization_code),
            ("reference_number", &self.reference_number),
            ("client_transaction_id", &self.client_transaction_id),
            ("avs_response_code", &self.avs_response_code),
            ("avs_response_message", &self.avs_response_message),
            ("cvn_response_code", &self.cvn_response_code),
            ("cvn_response_message", &self.cvn_response_message),
            ("card_type", &self.card_type),
            ("timestamp", &self.timestamp),
        ];
        collect_present(fields)
    }
}

/// Summary returned when the open batch is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Provider batch identifier.
    #[serde(default)]
    pub batch_id: Option<u64>,
    /// Batch sequence number.
    #[serde(default)]
    pub sequence_number: Option<String>,
    /// Number of transactions in the batch.
    #[serde(default)]
    pub transaction_count: Option<u32>,
    /// Total amount settled.
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    /// Gateway response code.
    #[serde(default)]
    pub response_code: Option<String>,
    /// Gateway response text.
    #[serde(default)]
    pub response_message: Option<String>,
}

impl Projection for BatchSummary {
    fn project(&self) -> ResultMapping {
        collect_present([
            ("sequence_number", &self.sequence_number),
            ("response_code", &self.response_code),
            ("response_message", &self.response_message),
        ])
    }
}

fn collect_present<const N: usize>(fields: [(&str, &Option<String>); N]) -> ResultMapping {
    fields
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_owned(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_projection_keeps_only_present_strings() {
        let response = TransactionResponse {
            transaction_id: Some("1234567890".into()),
            response_code: Some("00".into()),
            response_message: Some("APPROVAL".into()),
            authorized_amount: Some(dec!(3.33)),
            balance_amount: Some(dec!(0)),
            partial_approval: Some(false),
            ..TransactionResponse::default()
        };
        let mapping = response.project();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping["transaction_id"], "1234567890");
        assert_eq!(mapping["response_code"], "00");
        assert!(!mapping.contains_key("authorized_amount"));
        assert!(!mapping.contains_key("partial_approval"));
        assert!(!mapping.contains_key("card_type"));
    }

    #[test]
    fn test_projection_keeps_empty_strings() {
        let response = TransactionResponse {
            authorization_code: Some(String::new()),
            ..TransactionResponse::default()
        };
        assert_eq!(response.project()["authorization_code"], "");
    }

    #[test]
    fn test_batch_projection_drops_numbers() {
        let summary = BatchSummary {
            batch_id: Some(991),
            sequence_number: Some("12".into()),
            transaction_count: Some(4),
            total_amount: Some(dec!(40.00)),
            ..BatchSummary::default()
        };
        let mapping = summary.project();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["sequence_number"], "12");
    }

    #[test]
    fn test_deserialize_tolerates_unknown_fields() {
        let response: TransactionResponse = serde_json::from_value(serde_json::json!({
            "transactionId": "42",
            "authorizedAmount": "10.00",
            "hostResponse": { "nested": true }
        }))
        .unwrap();
        assert_eq!(response.transaction_id.as_deref(), Some("42"));
        assert_eq!(response.authorized_amount, Some(dec!(10.00)));
    }
}
