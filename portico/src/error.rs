//! Error types for Portico payment operations.

use std::fmt;

/// Base error type for a facade operation.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The request is well-formed JSON but carries values that cannot be used.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The payment processor declined, rejected, or could not be reached.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Provider credentials are missing or unusable.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

/// A request value failed validation beyond simple coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationError {
    /// Creates a new validation error for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Broad classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The processor answered and declined the operation.
    Declined,
    /// The processor refused the request with an unexpected HTTP status.
    Rejected,
    /// The processor could not be reached or the exchange was interrupted.
    Transport,
    /// The processor answered with a body that could not be understood.
    InvalidResponse,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Declined => "declined",
            Self::Rejected => "rejected",
            Self::Transport => "transport failure",
            Self::InvalidResponse => "invalid response",
        };
        f.write_str(name)
    }
}

/// Failure reported by (or while talking to) the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// What went wrong.
    pub kind: ProviderErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Processor response code, when the processor supplied one.
    pub response_code: Option<String>,
    /// The provider primitive that failed (e.g. `"void"`).
    pub operation: Option<&'static str>,
}

impl ProviderError {
    /// Creates a new provider error.
    #[must_use]
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response_code: None,
            operation: None,
        }
    }

    /// The processor declined the operation.
    #[must_use]
    pub fn declined(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Declined, message)
    }

    /// The processor answered with an unexpected status.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Rejected, message)
    }

    /// The processor could not be reached.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message)
    }

    /// The processor's answer could not be decoded.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    /// Sets the processor response code.
    #[must_use]
    pub fn with_response_code(mut self, code: impl Into<String>) -> Self {
        self.response_code = Some(code.into());
        self
    }

    /// Sets the provider primitive that failed.
    #[must_use]
    pub const fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(op) = self.operation {
            write!(f, "{op} ")?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(code) = &self.response_code {
            write!(f, " ({code})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Provider credentials are missing or invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationError {
    /// Reason for the error.
    pub reason: String,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider configuration error: {}", self.reason)
    }
}

impl std::error::Error for ConfigurationError {}
