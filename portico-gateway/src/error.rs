//! Error types for the gateway HTTP surface.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portico::PaymentError;

/// Errors returned by the payment endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Validation, configuration or provider failure of the operation.
    #[error("{0}")]
    Payment(#[from] PaymentError),

    /// The operation did not finish in time; it keeps running in the
    /// background.
    #[error("operation did not complete within {}s", .0.as_secs())]
    Timeout(Duration),

    /// The task running the operation panicked or was aborted.
    #[error("operation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// The HTTP status reported for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Payment(PaymentError::Validation(_) | PaymentError::Configuration(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Payment(PaymentError::Provider(_)) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

macro_rules! from_payment_cause {
    ($($cause:ty),+) => {
        $(
            impl From<$cause> for ApiError {
                fn from(error: $cause) -> Self {
                    Self::Payment(error.into())
                }
            }
        )+
    };
}

from_payment_cause!(
    portico::ValidationError,
    portico::ConfigurationError,
    portico::ProviderError
);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
