//! Transaction orchestration.
//!
//! [`TransactionOrchestrator`] turns one facade operation into one or two
//! provider calls. The interesting case is [`TransactionOrchestrator::refund`]:
//!
//! 1. A requested amount that differs from the authorized amount is a partial
//!    refund, issued directly.
//! 2. Otherwise the transaction is voided. A void is only legal before the
//!    enclosing batch settles, so when the provider rejects it the
//!    orchestrator issues a full refund of the authorized amount instead.
//!
//! [`TransactionOrchestrator::force_refund`] skips both the amount comparison
//! and the void attempt.
//!
//! Every provider failure is logged before it propagates.

use std::future::Future;

use rust_decimal::Decimal;
use tracing::Instrument;

use crate::amount::{Money, parse_amount};
use crate::card::{Address, CardData};
use crate::config::ProviderConfig;
use crate::error::{ConfigurationError, PaymentError, ProviderError};
use crate::gateway::{ChargeRequest, Gateway, TransactionHandle, VerificationRequest};
use crate::reference::ClientReference;
use crate::response::{BatchSummary, Projection, ResultMapping};

const AUTHORIZED_AMOUNT: &str = "authorizedAmount";

/// Sequences provider calls for a single request.
///
/// The orchestrator owns the gateway built for its request, so credentials
/// never leak between concurrent requests.
#[derive(Debug)]
pub struct TransactionOrchestrator<G> {
    gateway: G,
    currency: String,
    reference: Option<ClientReference>,
    qa: bool,
}

impl<G: Gateway> TransactionOrchestrator<G> {
    /// Creates an orchestrator for one request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if `config` fails
    /// [`ProviderConfig::validate`].
    pub fn new(
        gateway: G,
        config: &ProviderConfig,
        reference: Option<ClientReference>,
        qa: bool,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            gateway,
            currency: config.currency().to_owned(),
            reference,
            qa,
        })
    }

    /// The currency injected into every amount.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// The client reference attached to charges, if any.
    #[must_use]
    pub const fn reference(&self) -> Option<&ClientReference> {
        self.reference.as_ref()
    }

    /// Charges `card` for `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Provider`] if the processor rejects the charge.
    pub async fn sale(&self, amount: Decimal, card: &CardData) -> Result<ResultMapping, PaymentError> {
        let request = self.charge_request(amount, card);
        let response = self.call("charge", self.gateway.charge(&request)).await?;
        Ok(response.project())
    }

    /// Places a hold of `amount` on `card` without capturing it.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Provider`] if the processor rejects the hold.
    pub async fn authorize(
        &self,
        amount: Decimal,
        card: &CardData,
    ) -> Result<ResultMapping, PaymentError> {
        let request = self.charge_request(amount, card);
        let response = self.call("authorize", self.gateway.authorize(&request)).await?;
        Ok(response.project())
    }

    /// Verifies `card` against `address` without moving funds.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Provider`] if the processor rejects the card.
    pub async fn verify(
        &self,
        card: &CardData,
        address: &Address,
    ) -> Result<ResultMapping, PaymentError> {
        let request = VerificationRequest {
            card: card.clone(),
            address: address.clone(),
            client_transaction_id: self.reference.clone(),
        };
        let response = self.call("verify", self.gateway.verify(&request)).await?;
        Ok(response.project())
    }

    /// Closes the open batch and returns the provider's summary unprojected.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Provider`] if the batch cannot be closed.
    pub async fn settle(&self) -> Result<BatchSummary, PaymentError> {
        let summary = self.call("close_batch", self.gateway.close_batch()).await?;
        tracing::info!(?summary, "Result from closing the batch");
        Ok(summary)
    }

    /// Captures the authorized amount of an earlier authorization.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] if `authorized_amount` is not a
    /// decimal, or [`PaymentError::Provider`] if the capture fails.
    pub async fn capture(
        &self,
        transaction_id: &str,
        authorized_amount: &str,
    ) -> Result<ResultMapping, PaymentError> {
        let authorized = parse_amount(AUTHORIZED_AMOUNT, authorized_amount)?;
        let transaction = self.lookup(transaction_id).await?;
        let response = self
            .call("capture", self.gateway.capture(&transaction, &self.money(authorized)))
            .await?;
        Ok(response.project())
    }

    /// Refunds a transaction, voiding it when possible.
    ///
    /// A `requested_amount` different from `authorized_amount` is refunded
    /// directly. Otherwise a void is attempted first, and if the provider
    /// rejects it a refund of the full authorized amount is issued instead.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] if `authorized_amount` is not a
    /// decimal, or [`PaymentError::Provider`] if the lookup, the partial
    /// refund, or the fallback refund fails.
    pub async fn refund(
        &self,
        transaction_id: &str,
        authorized_amount: &str,
        requested_amount: Option<Decimal>,
    ) -> Result<ResultMapping, PaymentError> {
        let authorized = parse_amount(AUTHORIZED_AMOUNT, authorized_amount)?;
        let transaction = self.lookup(transaction_id).await?;

        if let Some(requested) = requested_amount.filter(|r| *r != authorized) {
            let response = self
                .call("refund", self.gateway.refund(&transaction, &self.money(requested)))
                .await?;
            return Ok(response.project());
        }

        match self.call("void", self.gateway.void(&transaction, None)).await {
            Ok(response) => Ok(response.project()),
            Err(error) => {
                tracing::error!(
                    transaction_id,
                    error = %error,
                    "Void rejected, the batch has probably closed; refunding instead"
                );
                let response = self
                    .call("refund", self.gateway.refund(&transaction, &self.money(authorized)))
                    .await?;
                Ok(response.project())
            }
        }
    }

    /// Refunds the full authorized amount without attempting a void.
    ///
    /// `_amount` is accepted for parity with [`Self::refund`] and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] if `authorized_amount` is not a
    /// decimal, or [`PaymentError::Provider`] if the refund fails.
    pub async fn force_refund(
        &self,
        transaction_id: &str,
        authorized_amount: &str,
        _amount: Option<Decimal>,
    ) -> Result<ResultMapping, PaymentError> {
        let authorized = parse_amount(AUTHORIZED_AMOUNT, authorized_amount)?;
        let transaction = self.lookup(transaction_id).await?;
        let response = self
            .call("refund", self.gateway.refund(&transaction, &self.money(authorized)))
            .await?;
        Ok(response.project())
    }

    /// Reverses a transaction for its authorized amount.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] if `authorized_amount` is not a
    /// decimal, or [`PaymentError::Provider`] if the reversal fails.
    pub async fn reversal(
        &self,
        transaction_id: &str,
        authorized_amount: &str,
    ) -> Result<ResultMapping, PaymentError> {
        let authorized = parse_amount(AUTHORIZED_AMOUNT, authorized_amount)?;
        let transaction = self.lookup(transaction_id).await?;
        let response = self
            .call("reverse", self.gateway.reverse(&transaction, &self.money(authorized)))
            .await?;
        Ok(response.project())
    }

    /// Voids a transaction in the configured currency. No refund is attempted
    /// if the void fails.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Provider`] if the lookup or the void fails.
    pub async fn void(&self, transaction_id: &str) -> Result<ResultMapping, PaymentError> {
        let transaction = self.lookup(transaction_id).await?;
        let response = self
            .call("void", self.gateway.void(&transaction, Some(&self.currency)))
            .await?;
        Ok(response.project())
    }

    async fn lookup(&self, transaction_id: &str) -> Result<TransactionHandle, ProviderError> {
        self.call("transaction", self.gateway.transaction(transaction_id))
            .await
    }

    fn charge_request(&self, amount: Decimal, card: &CardData) -> ChargeRequest {
        let request = ChargeRequest::new(self.money(amount), card.clone(), self.reference.clone());
        match card.cvn() {
            Some(cvn) => request.with_cvn(cvn),
            None => request,
        }
    }

    fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency.clone())
    }

    /// Runs one provider call inside a span and logs its failure.
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let span = tracing::info_span!(
            "portico.gateway",
            operation,
            reference = self.reference.as_ref().map(tracing::field::display),
            qa = self.qa,
        );
        fut.instrument(span).await.map_err(|error| {
            let error = if error.operation.is_none() {
                error.with_operation(operation)
            } else {
                error
            };
            tracing::error!(operation, error = %error, "Provider call failed");
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::Constants;
    use crate::error::ProviderErrorKind;
    use crate::response::TransactionResponse;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Charge { amount: Money, cvn: Option<String>, reference: Option<String> },
        Authorize { amount: Money, cvn: Option<String> },
        Verify { postal_code: Option<String>, reference: Option<String> },
        Lookup(String),
        Capture(Money),
        Refund(Money),
        Void(Option<String>),
        Reverse(Money),
        CloseBatch,
    }

    #[derive(Debug, Clone, Default)]
    struct RecordingGateway {
        calls: Arc<Mutex<Vec<Call>>>,
        failing: Vec<&'static str>,
    }

    impl RecordingGateway {
        fn failing(ops: &[&'static str]) -> Self {
            Self {
                failing: ops.to_vec(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, op: &'static str, call: Call) -> Result<TransactionResponse, ProviderError> {
            self.calls.lock().unwrap().push(call);
            if self.failing.contains(&op) {
                return Err(ProviderError::declined(format!("{op} not allowed")).with_response_code("36"));
            }
            Ok(TransactionResponse {
                transaction_id: Some("1234567890".into()),
                response_code: Some("00".into()),
                response_message: Some(op.into()),
                authorized_amount: Some(dec!(10.00)),
                ..TransactionResponse::default()
            })
        }
    }

    #[async_trait]
    impl Gateway for RecordingGateway {
        async fn charge(&self, request: &ChargeRequest) -> Result<TransactionResponse, ProviderError> {
            self.record(
                "charge",
                Call::Charge {
                    amount: request.amount.clone(),
                    cvn: request.cvn.clone(),
                    reference: request.client_transaction_id.as_ref().map(ToString::to_string),
                },
            )
        }

        async fn authorize(
            &self,
            request: &ChargeRequest,
        ) -> Result<TransactionResponse, ProviderError> {
            self.record(
                "authorize",
                Call::Authorize {
                    amount: request.amount.clone(),
                    cvn: request.cvn.clone(),
                },
            )
        }

        async fn verify(
            &self,
            request: &VerificationRequest,
        ) -> Result<TransactionResponse, ProviderError> {
            self.record(
                "verify",
                Call::Verify {
                    postal_code: request.address.postal_code.clone(),
                    reference: request.client_transaction_id.as_ref().map(ToString::to_string),
                },
            )
        }

        async fn transaction(&self, transaction_id: &str) -> Result<TransactionHandle, ProviderError> {
            self.record("transaction", Call::Lookup(transaction_id.to_owned()))?;
            Ok(TransactionHandle {
                transaction_id: transaction_id.to_owned(),
                status: Some("A".into()),
            })
        }

        async fn capture(
            &self,
            _transaction: &TransactionHandle,
            amount: &Money,
        ) -> Result<TransactionResponse, ProviderError> {
            self.record("capture", Call::Capture(amount.clone()))
        }

        async fn refund(
            &self,
            _transaction: &TransactionHandle,
            amount: &Money,
        ) -> Result<TransactionResponse, ProviderError> {
            self.record("refund", Call::Refund(amount.clone()))
        }

        async fn void(
            &self,
            _transaction: &TransactionHandle,
            currency: Option<&str>,
        ) -> Result<TransactionResponse, ProviderError> {
            self.record("void", Call::Void(currency.map(str::to_owned)))
        }

        async fn reverse(
            &self,
            _transaction: &TransactionHandle,
            amount: &Money,
        ) -> Result<TransactionResponse, ProviderError> {
            self.record("reverse", Call::Reverse(amount.clone()))
        }

        async fn close_batch(&self) -> Result<BatchSummary, ProviderError> {
            self.calls.lock().unwrap().push(Call::CloseBatch);
            if self.failing.contains(&"close_batch") {
                return Err(ProviderError::declined("no open batch"));
            }
            Ok(BatchSummary {
                batch_id: Some(77),
                sequence_number: Some("3".into()),
                transaction_count: Some(2),
                total_amount: Some(dec!(13.33)),
                ..BatchSummary::default()
            })
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            url: "https://cert.api2.heartlandportico.com".into(),
            private_key: "skapi_cert".into(),
            constants: Constants {
                default_currency: "USD".into(),
            },
            ..ProviderConfig::default()
        }
    }

    fn orchestrator(gateway: &RecordingGateway) -> TransactionOrchestrator<RecordingGateway> {
        TransactionOrchestrator::new(
            gateway.clone(),
            &config(),
            Some(ClientReference::parse("67e55044-10b1-426f-9247-bb680e5fe0c8")),
            true,
        )
        .unwrap()
    }

    fn card(cvn: Option<&str>) -> CardData {
        CardData::new("4111111111111111", "12", "30", cvn.map(str::to_owned)).unwrap()
    }

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, "USD")
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = TransactionOrchestrator::new(
            RecordingGateway::default(),
            &ProviderConfig::default(),
            Some(ClientReference::parse("r")),
            false,
        )
        .unwrap_err();
        assert!(err.reason.contains("url"));
    }

    #[tokio::test]
    async fn test_sale_without_cvn() {
        let gateway = RecordingGateway::default();
        let result = orchestrator(&gateway).sale(dec!(3.33), &card(None)).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Charge {
                amount: usd(dec!(3.33)),
                cvn: None,
                reference: Some("67e55044-10b1-426f-9247-bb680e5fe0c8".into()),
            }]
        );
        assert_eq!(result["transaction_id"], "1234567890");
        assert!(!result.contains_key("authorized_amount"));
    }

    #[tokio::test]
    async fn test_sale_without_reference() {
        let gateway = RecordingGateway::default();
        let orch = TransactionOrchestrator::new(gateway.clone(), &config(), None, false).unwrap();
        orch.sale(dec!(1), &card(None)).await.unwrap();

        assert_eq!(orch.reference(), None);
        assert!(matches!(&gateway.calls()[..], [Call::Charge { reference: None, .. }]));
    }

    #[tokio::test]
    async fn test_sale_with_cvn_attaches_it() {
        let gateway = RecordingGateway::default();
        orchestrator(&gateway).sale(dec!(3.33), &card(Some("123"))).await.unwrap();

        assert!(matches!(
            &gateway.calls()[..],
            [Call::Charge { cvn: Some(cvn), .. }] if cvn == "123"
        ));
    }

    #[tokio::test]
    async fn test_sale_with_empty_cvn_does_not_attach() {
        let gateway = RecordingGateway::default();
        orchestrator(&gateway).sale(dec!(1), &card(Some(""))).await.unwrap();

        assert!(matches!(&gateway.calls()[..], [Call::Charge { cvn: None, .. }]));
    }

    #[tokio::test]
    async fn test_authorize_branches_on_cvn() {
        let gateway = RecordingGateway::default();
        let orch = orchestrator(&gateway);
        orch.authorize(dec!(5), &card(Some("4321"))).await.unwrap();
        orch.authorize(dec!(5), &card(None)).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                Call::Authorize {
                    amount: usd(dec!(5)),
                    cvn: Some("4321".into()),
                },
                Call::Authorize {
                    amount: usd(dec!(5)),
                    cvn: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_sale_failure_propagates_without_retry() {
        let gateway = RecordingGateway::failing(&["charge"]);
        let err = orchestrator(&gateway).sale(dec!(3.33), &card(None)).await.unwrap_err();

        assert_eq!(gateway.calls().len(), 1);
        match err {
            PaymentError::Provider(e) => {
                assert_eq!(e.kind, ProviderErrorKind::Declined);
                assert_eq!(e.operation, Some("charge"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_attaches_address_and_reference() {
        let gateway = RecordingGateway::default();
        let address = Address::new(Some("6860 Dallas Pkwy".into()), Some("75024".into()));
        orchestrator(&gateway).verify(&card(None), &address).await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Verify {
                postal_code: Some("75024".into()),
                reference: Some("67e55044-10b1-426f-9247-bb680e5fe0c8".into()),
            }]
        );
    }

    #[tokio::test]
    async fn test_settle_returns_summary_verbatim() {
        let gateway = RecordingGateway::default();
        let summary = orchestrator(&gateway).settle().await.unwrap();

        assert_eq!(gateway.calls(), vec![Call::CloseBatch]);
        assert_eq!(summary.batch_id, Some(77));
        assert_eq!(summary.total_amount, Some(dec!(13.33)));
    }

    #[tokio::test]
    async fn test_capture_uses_authorized_amount() {
        let gateway = RecordingGateway::default();
        orchestrator(&gateway).capture("1234567890", "10.00").await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Lookup("1234567890".into()), Call::Capture(usd(dec!(10.00)))]
        );
    }

    #[tokio::test]
    async fn test_refund_partial_amount_skips_void() {
        let gateway = RecordingGateway::default();
        let result = orchestrator(&gateway)
            .refund("1234567890", "10.00", Some(dec!(4.00)))
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Lookup("1234567890".into()), Call::Refund(usd(dec!(4.00)))]
        );
        assert_eq!(result["response_message"], "refund");
    }

    #[tokio::test]
    async fn test_refund_matching_amount_voids() {
        let gateway = RecordingGateway::default();
        orchestrator(&gateway)
            .refund("1234567890", "10.00", Some(dec!(10)))
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Lookup("1234567890".into()), Call::Void(None)]
        );
    }

    #[tokio::test]
    async fn test_refund_void_succeeds() {
        let gateway = RecordingGateway::default();
        let result = orchestrator(&gateway)
            .refund("1234567890", "10.00", None)
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Lookup("1234567890".into()), Call::Void(None)]
        );
        assert_eq!(result["response_message"], "void");
    }

    #[tokio::test]
    async fn test_refund_falls_back_when_void_fails() {
        let gateway = RecordingGateway::failing(&["void"]);
        let result = orchestrator(&gateway)
            .refund("1234567890", "10.00", None)
            .await
            .unwrap();

        assert_eq!(
            gateway.calls(),
            vec![
                Call::Lookup("1234567890".into()),
                Call::Void(None),
                Call::Refund(usd(dec!(10.00))),
            ]
        );
        assert_eq!(result["response_message"], "refund");
    }

    #[tokio::test]
    async fn test_refund_fallback_failure_propagates() {
        let gateway = RecordingGateway::failing(&["void", "refund"]);
        let err = orchestrator(&gateway)
            .refund("1234567890", "10.00", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Provider(ref e) if e.operation == Some("refund")));
        assert_eq!(gateway.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_refund_rejects_malformed_authorized_amount_before_calling() {
        let gateway = RecordingGateway::default();
        let err = orchestrator(&gateway)
            .refund("1234567890", "None", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Validation(_)));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refund_lookup_failure_skips_void() {
        let gateway = RecordingGateway::failing(&["transaction"]);
        let err = orchestrator(&gateway)
            .refund("missing", "10.00", None)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Provider(_)));
        assert_eq!(gateway.calls(), vec![Call::Lookup("missing".into())]);
    }

    #[tokio::test]
    async fn test_force_refund_never_voids() {
        for amount in [None, Some(dec!(10.00)), Some(dec!(2.50))] {
            let gateway = RecordingGateway::default();
            orchestrator(&gateway)
                .force_refund("1234567890", "10.00", amount)
                .await
                .unwrap();

            assert_eq!(
                gateway.calls(),
                vec![Call::Lookup("1234567890".into()), Call::Refund(usd(dec!(10.00)))]
            );
        }
    }

    #[tokio::test]
    async fn test_reversal_uses_reverse_primitive() {
        let gateway = RecordingGateway::default();
        orchestrator(&gateway).reversal("1234567890", "7.25").await.unwrap();

        assert_eq!(
            gateway.calls(),
            vec![Call::Lookup("1234567890".into()), Call::Reverse(usd(dec!(7.25)))]
        );
    }

    #[tokio::test]
    async fn test_void_has_no_fallback() {
        let gateway = RecordingGateway::failing(&["void"]);
        let err = orchestrator(&gateway).void("1234567890").await.unwrap_err();

        assert!(matches!(err, PaymentError::Provider(ref e) if e.operation == Some("void")));
        assert_eq!(
            gateway.calls(),
            vec![Call::Lookup("1234567890".into()), Call::Void(Some("USD".into()))]
        );
    }
}
