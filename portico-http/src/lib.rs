//! JSON/HTTP transport to the payment processor.
//!
//! Provides [`HttpGateway`], a [`portico::Gateway`] that talks to the
//! processor over JSON, and [`HttpGatewayFactory`], which builds one gateway
//! per request from that request's credentials.
//!
//! # Modules
//!
//! - [`constants`] - Header names and endpoint paths
//! - [`gateway`] - The HTTP gateway client and its errors

pub mod constants;
pub mod gateway;

pub use gateway::{HttpGateway, HttpGatewayError, HttpGatewayFactory};
