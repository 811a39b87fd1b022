//! Provider primitives used by the orchestrator.
//!
//! A [`Gateway`] is built for a single request from that request's
//! [`ProviderConfig`](crate::config::ProviderConfig), so two concurrent
//! requests with different credentials never share provider state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::Money;
use crate::card::{Address, CardData};
use crate::config::ProviderConfig;
use crate::error::{ConfigurationError, ProviderError};
use crate::reference::ClientReference;
use crate::response::{BatchSummary, TransactionResponse};

/// Provider-side handle of an earlier transaction.
///
/// Only obtained from [`Gateway::transaction`]; never built from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHandle {
    /// Provider transaction identifier.
    pub transaction_id: String,
    /// Provider status, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Parameters of a charge or authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Amount and currency.
    pub amount: Money,
    /// Card to charge.
    pub card: CardData,
    /// CVN to verify alongside the charge.
    pub cvn: Option<String>,
    /// Correlation id for the provider.
    pub client_transaction_id: Option<ClientReference>,
}

impl ChargeRequest {
    /// Creates a charge without a CVN.
    #[must_use]
    pub const fn new(
        amount: Money,
        card: CardData,
        client_transaction_id: Option<ClientReference>,
    ) -> Self {
        Self {
            amount,
            card,
            cvn: None,
            client_transaction_id,
        }
    }

    /// Attaches a CVN to the charge.
    #[must_use]
    pub fn with_cvn(mut self, cvn: impl Into<String>) -> Self {
        self.cvn = Some(cvn.into());
        self
    }
}

/// Parameters of a zero-amount card verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// Card to verify.
    pub card: CardData,
    /// Billing address checked by the issuer.
    pub address: Address,
    /// Correlation id for the provider.
    pub client_transaction_id: Option<ClientReference>,
}

/// The payment processor, as seen by the orchestrator.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Charges a card (authorize and capture in one step).
    async fn charge(&self, request: &ChargeRequest) -> Result<TransactionResponse, ProviderError>;

    /// Places a hold on a card without capturing funds.
    async fn authorize(&self, request: &ChargeRequest)
    -> Result<TransactionResponse, ProviderError>;

    /// Verifies a card without moving funds.
    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<TransactionResponse, ProviderError>;

    /// Looks up an earlier transaction by its provider id.
    async fn transaction(&self, transaction_id: &str) -> Result<TransactionHandle, ProviderError>;

    /// Captures a previously authorized transaction.
    async fn capture(
        &self,
        transaction: &TransactionHandle,
        amount: &Money,
    ) -> Result<TransactionResponse, ProviderError>;

    /// Refunds all or part of a settled transaction.
    async fn refund(
        &self,
        transaction: &TransactionHandle,
        amount: &Money,
    ) -> Result<TransactionResponse, ProviderError>;

    /// Voids a transaction whose batch has not closed yet.
    ///
    /// `currency` is sent only when given; the provider otherwise voids in the
    /// transaction's own currency.
    async fn void(
        &self,
        transaction: &TransactionHandle,
        currency: Option<&str>,
    ) -> Result<TransactionResponse, ProviderError>;

    /// Reverses a transaction.
    async fn reverse(
        &self,
        transaction: &TransactionHandle,
        amount: &Money,
    ) -> Result<TransactionResponse, ProviderError>;

    /// Closes the currently open batch.
    async fn close_batch(&self) -> Result<BatchSummary, ProviderError>;
}

/// Builds a fresh [`Gateway`] for each request's credentials.
pub trait GatewayFactory: Send + Sync + 'static {
    /// The gateway type produced for each request.
    type Gateway: Gateway + 'static;

    /// Builds a gateway bound to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the credentials cannot be used to
    /// build a client.
    fn connect(&self, config: &ProviderConfig) -> Result<Self::Gateway, ConfigurationError>;
}
