//! HTTP-specific constants for the provider protocol.
//!
//! Header names are lowercase, as `http` stores them.

/// Header carrying the secret API key (marked sensitive).
pub const SECRET_API_KEY_HEADER: &str = "x-secret-api-key";

/// Header carrying the integrator developer id.
pub const DEVELOPER_ID_HEADER: &str = "x-developer-id";

/// Header carrying the integration version number.
pub const VERSION_NUMBER_HEADER: &str = "x-version-number";

/// Endpoint for sales.
pub const CHARGES_PATH: &str = "charges";

/// Endpoint for authorizations.
pub const AUTHORIZATIONS_PATH: &str = "authorizations";

/// Endpoint for card verifications.
pub const VERIFICATIONS_PATH: &str = "verifications";

/// Collection of earlier transactions; actions are sub-paths of an id.
pub const TRANSACTIONS_PATH: &str = "transactions";

/// Batch close endpoint, relative to the base URL.
pub const BATCH_CLOSE_PATH: [&str; 2] = ["batches", "close"];
