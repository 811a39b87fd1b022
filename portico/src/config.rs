//! Per-request provider credentials.
//!
//! Every facade request carries its own `params` block. The values are used to
//! build a provider client for that request only and are never persisted.
//!
//! # Example
//!
//! ```rust
//! use portico::config::ProviderConfig;
//!
//! let params: ProviderConfig = serde_json::from_value(serde_json::json!({
//!     "url": "https://cert.api2.heartlandportico.com",
//!     "privateKey": "skapi_cert_example",
//!     "developerId": "002914",
//!     "constants": { "defaultCurrency": "USD" },
//!     "unknownField": "ignored"
//! }))
//! .unwrap();
//! assert!(params.validate().is_ok());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Constants shared by every operation of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constants {
    /// Currency injected into every amount-bearing provider call.
    #[serde(default, alias = "default_currency")]
    pub default_currency: String,
}

/// Provider endpoint and credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider service URL.
    #[serde(default)]
    pub url: String,
    /// Public API key.
    #[serde(default, alias = "public_key")]
    pub public_key: String,
    /// Secret API key used to authenticate provider calls.
    #[serde(default, alias = "private_key")]
    pub private_key: String,
    /// Terminal identifier.
    #[serde(default, alias = "term_id")]
    pub term_id: String,
    /// Certification string.
    #[serde(default, alias = "cert_str")]
    pub cert_str: String,
    /// Merchant account number.
    #[serde(default, alias = "account_num")]
    pub account_num: String,
    /// Integrator developer identifier.
    #[serde(default, alias = "developer_id")]
    pub developer_id: String,
    /// Integration version number.
    #[serde(default, alias = "version_number")]
    pub version_number: String,
    /// Legacy username credential.
    #[serde(default)]
    pub username: String,
    /// Legacy password credential.
    #[serde(default)]
    pub password: String,
    /// Request-wide constants.
    #[serde(default)]
    pub constants: Constants,
}

impl ProviderConfig {
    /// The configured default currency.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.constants.default_currency
    }

    /// Checks that the credentials are usable for provider calls.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the URL is not an absolute http(s)
    /// URL, the private key is empty, or the default currency is not a
    /// three-letter code.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigurationError::new("provider url is missing"));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigurationError::new(format!(
                "provider url `{url}` must be an absolute http(s) URL"
            )));
        }
        if self.private_key.trim().is_empty() {
            return Err(ConfigurationError::new("private key is missing"));
        }
        let currency = self.currency();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigurationError::new(format!(
                "default currency `{currency}` is not a three-letter code"
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("public_key", &self.public_key)
            .field("private_key", &"<hidden>")
            .field("term_id", &self.term_id)
            .field("developer_id", &self.developer_id)
            .field("version_number", &self.version_number)
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .field("constants", &self.constants)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProviderConfig {
        ProviderConfig {
            url: "https://cert.api2.heartlandportico.com".into(),
            private_key: "skapi_cert_secret".into(),
            constants: Constants {
                default_currency: "USD".into(),
            },
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_url() {
        let config = ProviderConfig {
            url: String::new(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_relative_url() {
        let config = ProviderConfig {
            url: "cert.api2.heartlandportico.com".into(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_currency() {
        let config = ProviderConfig {
            constants: Constants::default(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.reason.contains("currency"));
    }

    #[test]
    fn test_snake_case_aliases() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "url": "https://example.test",
            "private_key": "secret",
            "developer_id": "dev",
            "constants": { "default_currency": "USD", "extra": 1 },
        }))
        .unwrap();
        assert_eq!(config.private_key, "secret");
        assert_eq!(config.developer_id, "dev");
        assert_eq!(config.currency(), "USD");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = ProviderConfig {
            password: "hunter2".into(),
            ..valid()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("skapi_cert_secret"));
        assert!(!debug.contains("hunter2"));
    }
}
