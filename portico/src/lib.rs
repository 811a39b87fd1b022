#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the Portico card payment facade.
//!
//! Portico accepts card-present and card-not-present operations (sale,
//! authorize, verify, settle, capture, refund, reversal, void and forced
//! refund), normalizes them into typed requests, and delegates the movement of
//! funds to an external payment processor reached through the [`Gateway`]
//! trait.
//!
//! # Modules
//!
//! - [`amount`] - Decimal amounts paired with the configured currency
//! - [`card`] - Card and billing address data
//! - [`config`] - Per-request provider credentials
//! - [`error`] - Validation, provider and configuration errors
//! - [`gateway`] - The provider primitives the orchestrator relies on
//! - [`orchestrator`] - Operation sequencing and the void/refund fallback
//! - [`redact`] - Masking of card, CVN and SSN shaped substrings in log output
//! - [`reference`] - Client correlation identifiers
//! - [`request`] - Normalized request shapes accepted by the HTTP facade
//! - [`response`] - Provider responses and their flat string projection

pub mod amount;
pub mod card;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod redact;
pub mod reference;
pub mod request;
pub mod response;

pub use error::{ConfigurationError, PaymentError, ProviderError, ValidationError};
pub use gateway::{Gateway, GatewayFactory};
pub use orchestrator::TransactionOrchestrator;
pub use response::{Projection, ResultMapping};
