//! Portico payment gateway server.
//!
//! Exposes the Portico payment facade over HTTP: Axum route handlers for
//! sale, authorize, verify, settle, capture, refund, reversal, void and
//! forced refund, backed by the JSON/HTTP provider client of `portico-http`.
//!
//! # Modules
//!
//! - [`handlers`] - Axum route handlers and router builder
//! - [`error`] - HTTP error mapping
//! - [`config`] - Server configuration with environment variable expansion
//! - [`telemetry`] - Log subscriber with sensitive-data masking
//! - [`util`] - Signal handling and shutdown draining

pub mod config;
pub mod error;
pub mod handlers;
pub mod telemetry;
pub mod util;

pub use handlers::{AppState, gateway_router};
