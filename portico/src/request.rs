//! Normalized request shapes accepted by the facade.
//!
//! Bodies are parsed into strict typed shapes; fields the shapes do not
//! declare are dropped without error. Field names are camelCase, and the
//! snake_case names of earlier clients are accepted as aliases. Transaction
//! ids and authorized amounts may arrive as JSON strings or numbers.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{DeserializeAs, SerializeAs, serde_as};

use crate::card::{Address, CardData};
use crate::config::ProviderConfig;
use crate::error::ValidationError;
use crate::reference::{ClientReference, TextVisitor};

/// Parses a JSON body into one of the request shapes.
///
/// # Errors
///
/// Returns [`ValidationError`] if a declared field is missing or has the
/// wrong type. Undeclared fields never cause an error.
pub fn normalize<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, ValidationError> {
    serde_json::from_value(body).map_err(|e| ValidationError::new("body", e.to_string()))
}

/// A text field that also accepts a JSON number, kept as its decimal text.
struct Text;

impl<'de> DeserializeAs<'de, String> for Text {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        deserializer.deserialize_any(TextVisitor)
    }
}

impl SerializeAs<String> for Text {
    fn serialize_as<S: Serializer>(source: &String, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(source)
    }
}

/// Fields shared by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRequest {
    /// Provider endpoint and credentials for this request.
    pub params: ProviderConfig,
    /// Client correlation id, if the caller sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ClientReference>,
    /// Whether the request targets the provider's QA environment.
    #[serde(default)]
    pub qa: bool,
}

/// Card fields as sent by the caller.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    /// Card number.
    pub number: String,
    /// Expiry month.
    #[serde(alias = "exp_month")]
    pub exp_month: String,
    /// Two-digit expiry year.
    #[serde(alias = "exp_year")]
    pub exp_year: String,
    /// Optional card verification number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvn: Option<String>,
}

impl CardInput {
    /// Converts the caller's card fields into [`CardData`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the expiry year is malformed.
    pub fn to_card_data(&self) -> Result<CardData, ValidationError> {
        CardData::new(
            self.number.clone(),
            self.exp_month.clone(),
            &self.exp_year,
            self.cvn.clone(),
        )
    }
}

impl fmt::Debug for CardInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInput")
            .field("number", &"<hidden>")
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvn", &self.cvn.as_ref().map(|_| "<hidden>"))
            .finish()
    }
}

/// Body of `/sale` and `/authorize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    /// Shared fields.
    #[serde(flatten)]
    pub base: BaseRequest,
    /// Amount to charge or hold.
    pub amount: Decimal,
    /// Cardholder zip code.
    #[serde(default, alias = "zip_code", skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// Card to charge.
    #[serde(alias = "creditCardData", alias = "credit_card_data")]
    pub card: CardInput,
}

/// Body of `/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Shared fields.
    #[serde(flatten)]
    pub base: BaseRequest,
    /// Cardholder zip code.
    #[serde(default, alias = "zip_code", skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// Cardholder street line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Card to verify.
    #[serde(alias = "creditCardData", alias = "credit_card_data")]
    pub card: CardInput,
}

impl VerifyRequest {
    /// The billing address carried by the request.
    #[must_use]
    pub fn address(&self) -> Address {
        Address::new(self.street.clone(), self.zip_code.clone())
    }
}

/// Body of `/capture`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    /// Shared fields.
    #[serde(flatten)]
    pub base: BaseRequest,
    /// Provider id of the authorization to capture.
    #[serde_as(as = "Text")]
    #[serde(alias = "heartlandTransactionId", alias = "heartland_transaction_id")]
    pub transaction_id: String,
    /// Amount originally authorized, as text.
    #[serde_as(as = "Text")]
    #[serde(
        alias = "paymentTransactionAmount",
        alias = "payment_transaction_amount"
    )]
    pub authorized_amount: String,
}

/// Body of `/refund`, `/reversal`, `/void` and `/force-refund`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Shared fields.
    #[serde(flatten)]
    pub base: BaseRequest,
    /// Provider id of the transaction to act on.
    #[serde_as(as = "Text")]
    #[serde(alias = "heartlandTransactionId", alias = "heartland_transaction_id")]
    pub transaction_id: String,
    /// Amount originally authorized, as text.
    #[serde_as(as = "Text")]
    #[serde(
        alias = "paymentTransactionAmount",
        alias = "payment_transaction_amount"
    )]
    pub authorized_amount: String,
    /// Requested refund amount; absent means the full authorized amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}
