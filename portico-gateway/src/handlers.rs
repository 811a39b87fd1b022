//! Axum route handlers for the payment facade.
//!
//! Every payment endpoint accepts a JSON body, normalizes it into one of the
//! request shapes in [`portico::request`], and either echoes it back (echo
//! mode) or runs the matching [`TransactionOrchestrator`] operation.
//!
//! Operations run on a [`TaskTracker`] rather than on the request task, so a
//! caller that disconnects or times out never interrupts a provider call half
//! way through a void/refund sequence.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use portico::request::{
    BaseRequest, CaptureRequest, RefundRequest, SaleRequest, VerifyRequest, normalize,
};
use portico::{GatewayFactory, PaymentError, ResultMapping, TransactionOrchestrator};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::error::ApiError;

/// Shared application state for the payment endpoints.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct AppState<F> {
    factory: Arc<F>,
    echo: bool,
    request_timeout: Duration,
    operations: TaskTracker,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            echo: self.echo,
            request_timeout: self.request_timeout,
            operations: self.operations.clone(),
        }
    }
}

impl<F: GatewayFactory> AppState<F> {
    /// Creates the state from the server configuration.
    ///
    /// Operations are spawned on `operations`; close and wait on it to drain
    /// them at shutdown.
    pub fn new(factory: F, config: &GatewayConfig, operations: TaskTracker) -> Self {
        Self {
            factory: Arc::new(factory),
            echo: config.echo,
            request_timeout: config.request_timeout(),
            operations,
        }
    }

    /// Overrides how long a caller waits for an operation.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds an orchestrator for `base` and runs `operation` on the tracker.
    ///
    /// Credentials are validated before any provider call. The caller waits
    /// at most the request timeout; the operation itself always runs to
    /// completion.
    async fn execute<T, Op, Fut>(&self, base: &BaseRequest, operation: Op) -> Result<T, ApiError>
    where
        T: Send + 'static,
        Op: FnOnce(TransactionOrchestrator<F::Gateway>) -> Fut,
        Fut: Future<Output = Result<T, PaymentError>> + Send + 'static,
    {
        base.params.validate()?;
        let gateway = self.factory.connect(&base.params)?;
        let orchestrator =
            TransactionOrchestrator::new(gateway, &base.params, base.reference.clone(), base.qa)?;

        let task = self
            .operations
            .spawn(operation(orchestrator).instrument(tracing::Span::current()));
        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(joined) => Ok(joined??),
            Err(_) => {
                tracing::warn!(
                    reference = base.reference.as_ref().map(tracing::field::display),
                    "Operation still running after the request timeout"
                );
                Err(ApiError::Timeout(self.request_timeout))
            }
        }
    }
}

fn echoed<T: Serialize>(echo: bool, request: &T) -> Option<Response> {
    echo.then(|| Json(request).into_response())
}

fn settled() -> Json<Value> {
    Json(json!({ "settleStatus": true }))
}

/// `POST /sale` - Charges a card.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_sale<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: SaleRequest = normalize(body)?;
    if let Some(echoed) = echoed(state.echo, &request) {
        return Ok(echoed);
    }
    let card = request.card.to_card_data()?;
    let amount = request.amount;
    let mapping = state
        .execute(&request.base, move |orchestrator| async move {
            orchestrator.sale(amount, &card).await
        })
        .await?;
    Ok(Json(mapping).into_response())
}

/// `POST /authorize` - Places a hold on a card.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_authorize<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: SaleRequest = normalize(body)?;
    if let Some(echoed) = echoed(state.echo, &request) {
        return Ok(echoed);
    }
    let card = request.card.to_card_data()?;
    let amount = request.amount;
    let mapping = state
        .execute(&request.base, move |orchestrator| async move {
            orchestrator.authorize(amount, &card).await
        })
        .await?;
    Ok(Json(mapping).into_response())
}

/// `POST /verify` - Verifies a card and billing address.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_verify<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: VerifyRequest = normalize(body)?;
    if let Some(echoed) = echoed(state.echo, &request) {
        return Ok(echoed);
    }
    let card = request.card.to_card_data()?;
    let address = request.address();
    let mapping = state
        .execute(&request.base, move |orchestrator| async move {
            orchestrator.verify(&card, &address).await
        })
        .await?;
    Ok(Json(mapping).into_response())
}

/// `POST /settle` - Closes the open batch.
///
/// # Errors
///
/// Returns 400 on invalid credentials, 502 if the provider fails.
pub async fn post_settle<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: BaseRequest = normalize(body)?;
    if let Some(echoed) = echoed(state.echo, &request) {
        return Ok(echoed);
    }
    state
        .execute(&request, |orchestrator| async move {
            orchestrator.settle().await
        })
        .await?;
    Ok(settled().into_response())
}

/// `POST /capture` - Captures an earlier authorization.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_capture<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let request: CaptureRequest = normalize(body)?;
    if let Some(echoed) = echoed(state.echo, &request) {
        return Ok(echoed);
    }
    let CaptureRequest {
        base,
        transaction_id,
        authorized_amount,
    } = request;
    let mapping = state
        .execute(&base, move |orchestrator| async move {
            orchestrator
                .capture(&transaction_id, &authorized_amount)
                .await
        })
        .await?;
    tracing::info!(?mapping, "Captured transaction");
    Ok(settled().into_response())
}

/// The operation a refund-shaped request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefundKind {
    Refund,
    ForceRefund,
    Reversal,
    Void,
}

async fn refund_like<F: GatewayFactory>(
    state: &AppState<F>,
    body: Value,
    kind: RefundKind,
) -> Result<Response, ApiError> {
    let request: RefundRequest = normalize(body)?;
    if let Some(echoed) = echoed(state.echo, &request) {
        return Ok(echoed);
    }
    let RefundRequest {
        base,
        transaction_id,
        authorized_amount,
        amount,
    } = request;
    let mapping: ResultMapping = state
        .execute(&base, move |orchestrator| async move {
            match kind {
                RefundKind::Refund => {
                    orchestrator
                        .refund(&transaction_id, &authorized_amount, amount)
                        .await
                }
                RefundKind::ForceRefund => {
                    orchestrator
                        .force_refund(&transaction_id, &authorized_amount, amount)
                        .await
                }
                RefundKind::Reversal => {
                    orchestrator
                        .reversal(&transaction_id, &authorized_amount)
                        .await
                }
                RefundKind::Void => orchestrator.void(&transaction_id).await,
            }
        })
        .await?;
    Ok(Json(mapping).into_response())
}

/// `POST /refund` - Voids or refunds a transaction.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_refund<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    refund_like(&state, body, RefundKind::Refund).await
}

/// `POST /force-refund` - Refunds the full authorized amount, never voiding.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_force_refund<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    refund_like(&state, body, RefundKind::ForceRefund).await
}

/// `POST /reversal` - Reverses a transaction.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_reversal<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    refund_like(&state, body, RefundKind::Reversal).await
}

/// `POST /void` - Voids a transaction, with no refund fallback.
///
/// # Errors
///
/// Returns 400 on invalid input or credentials, 502 if the provider fails.
pub async fn post_void<F: GatewayFactory>(
    State(state): State<AppState<F>>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    refund_like(&state, body, RefundKind::Void).await
}

/// `GET /health` - Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Creates an Axum [`Router`] with all payment endpoints.
///
/// Payment endpoints are nested under `route_prefix` (an empty prefix mounts
/// them at the root):
/// - `POST /sale`, `POST /authorize`, `POST /verify`
/// - `POST /settle`, `POST /capture`
/// - `POST /refund`, `POST /reversal`, `POST /void`
/// - `POST /force-refund` (also `POST /force/refund`)
///
/// `GET /health` is always served at the root.
pub fn gateway_router<F: GatewayFactory>(state: AppState<F>, route_prefix: &str) -> Router {
    let api = Router::new()
        .route("/sale", post(post_sale::<F>))
        .route("/authorize", post(post_authorize::<F>))
        .route("/verify", post(post_verify::<F>))
        .route("/settle", post(post_settle::<F>))
        .route("/capture", post(post_capture::<F>))
        .route("/refund", post(post_refund::<F>))
        .route("/reversal", post(post_reversal::<F>))
        .route("/void", post(post_void::<F>))
        .route("/force-refund", post(post_force_refund::<F>))
        .route("/force/refund", post(post_force_refund::<F>))
        .with_state(state);

    let prefix = route_prefix.trim().trim_matches('/');
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{prefix}"), api)
    };
    router.route("/health", get(health))
}
