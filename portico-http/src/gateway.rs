//! A [`portico::Gateway`] that reaches the payment processor over JSON/HTTP.
//!
//! [`HttpGateway`] maps every provider primitive onto one endpoint relative to
//! the request's `params.url`:
//!
//! | Primitive | Request |
//! |---|---|
//! | charge | `POST charges` |
//! | authorize | `POST authorizations` |
//! | verify | `POST verifications` |
//! | transaction lookup | `GET transactions/{id}` |
//! | capture, refund, void, reverse | `POST transactions/{id}/{action}` |
//! | batch close | `POST batches/close` |
//!
//! ## Error Handling
//!
//! [`HttpGatewayError`] keeps the transport-level context (URL, transport,
//! JSON decoding, unexpected status). It converts into a
//! [`ProviderError`] at the [`Gateway`] boundary; a non-200 reply whose body
//! carries a `responseCode` becomes a decline, anything else a rejection.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue, InvalidHeaderValue};
use http::{HeaderMap, StatusCode};
use portico::amount::Money;
use portico::card::{Address, CardData};
use portico::config::ProviderConfig;
use portico::gateway::{ChargeRequest, TransactionHandle, VerificationRequest};
use portico::reference::ClientReference;
use portico::response::{BatchSummary, TransactionResponse};
use portico::{ConfigurationError, Gateway, GatewayFactory, ProviderError};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::constants::{
    AUTHORIZATIONS_PATH, BATCH_CLOSE_PATH, CHARGES_PATH, DEVELOPER_ID_HEADER,
    SECRET_API_KEY_HEADER, TRANSACTIONS_PATH, VERIFICATIONS_PATH, VERSION_NUMBER_HEADER,
};

/// A client for one request's view of the payment processor.
///
/// Built per request from that request's credentials; the underlying
/// [`Client`] connection pool may be shared through [`HttpGateway::with_client`].
#[derive(Clone, Debug)]
pub struct HttpGateway {
    /// Base URL of the processor (e.g. `https://cert.api2.example.com/`)
    base_url: Url,
    /// Reqwest HTTP client
    client: Client,
    /// Headers sent with each request, credentials included
    headers: HeaderMap,
    /// Optional per-request timeout
    timeout: Option<Duration>,
}

/// Errors that can occur while talking to the processor over HTTP.
#[derive(Debug, thiserror::Error)]
pub enum HttpGatewayError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The URL cannot carry endpoint paths (e.g. `mailto:`).
    #[error("URL cannot be used as a base: {url}")]
    CannotBeABase {
        /// The offending URL.
        url: String,
    },
    /// A credential cannot be sent as a header value.
    #[error("Invalid header value for {name}: {source}")]
    InvalidHeader {
        /// Header name.
        name: &'static str,
        /// The underlying header error.
        #[source]
        source: InvalidHeaderValue,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

/// Body of a non-200 reply that carries a processor decision.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeclineBody {
    response_code: String,
    #[serde(default)]
    response_message: Option<String>,
}

impl From<HttpGatewayError> for ProviderError {
    fn from(error: HttpGatewayError) -> Self {
        match error {
            HttpGatewayError::HttpStatus { status, body, .. } => {
                match serde_json::from_str::<DeclineBody>(&body) {
                    Ok(decline) => {
                        let message = decline
                            .response_message
                            .unwrap_or_else(|| format!("declined with HTTP status {status}"));
                        Self::declined(message).with_response_code(decline.response_code)
                    }
                    Err(_) => Self::rejected(format!("HTTP status {status}: {body}")),
                }
            }
            other @ HttpGatewayError::JsonDeserialization { .. } => {
                Self::invalid_response(other.to_string())
            }
            other => Self::transport(other.to_string()),
        }
    }
}

impl HttpGateway {
    /// Returns the headers sent with every request.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the configured timeout, if any.
    pub const fn timeout(&self) -> &Option<Duration> {
        &self.timeout
    }

    /// Constructs a new [`HttpGateway`] from a base URL, without credentials.
    ///
    /// # Errors
    ///
    /// Returns [`HttpGatewayError::CannotBeABase`] if endpoint paths cannot be
    /// appended to `base_url`.
    pub fn try_new(base_url: Url) -> Result<Self, HttpGatewayError> {
        if base_url.cannot_be_a_base() {
            return Err(HttpGatewayError::CannotBeABase {
                url: base_url.to_string(),
            });
        }
        Ok(Self {
            base_url,
            client: Client::new(),
            headers: HeaderMap::new(),
            timeout: None,
        })
    }

    /// Constructs a gateway for `config`, with its credentials as headers.
    ///
    /// # Errors
    ///
    /// Returns [`HttpGatewayError`] if the URL is unusable or a credential is
    /// not a valid header value.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, HttpGatewayError> {
        let headers = credential_headers(config)?;
        Ok(Self::try_from(config.url.as_str())?.with_headers(headers))
    }

    /// Uses `client` instead of a fresh one, sharing its connection pool.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Adds `headers` to every future request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the URL of an endpoint from path segments below the base URL.
    ///
    /// Segments are percent-encoded, so a transaction id can never escape its
    /// path position.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `try_new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, HttpGatewayError>
    where
        T: Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        self.send(self.client.post(url.clone()).json(payload), context)
            .await
    }

    async fn get_json<R>(&self, url: &Url, context: &'static str) -> Result<R, HttpGatewayError>
    where
        R: serde::de::DeserializeOwned,
    {
        self.send(self.client.get(url.clone()), context).await
    }

    /// Applies headers and timeout, sends, and decodes a 200 reply as `R`.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "portico.http",
            skip_all,
            fields(
                context = context,
                timeout = ?self.timeout,
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        )
    )]
    async fn send<R>(
        &self,
        mut req: RequestBuilder,
        context: &'static str,
    ) -> Result<R, HttpGatewayError>
    where
        R: serde::de::DeserializeOwned,
    {
        for (key, value) in &self.headers {
            req = req.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| HttpGatewayError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| HttpGatewayError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| HttpGatewayError::ResponseBodyRead { context, source: e })?;
            Err(HttpGatewayError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

/// Parses a base URL, tolerating surrounding whitespace.
impl TryFrom<&str> for HttpGateway {
    type Error = HttpGatewayError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(value.trim()).map_err(|e| HttpGatewayError::UrlParse {
            context: "Failed to parse provider url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

fn credential_headers(config: &ProviderConfig) -> Result<HeaderMap, HttpGatewayError> {
    let mut headers = HeaderMap::new();
    let credentials = [
        (SECRET_API_KEY_HEADER, config.private_key.as_str()),
        (DEVELOPER_ID_HEADER, config.developer_id.as_str()),
        (VERSION_NUMBER_HEADER, config.version_number.as_str()),
    ];
    for (name, value) in credentials {
        if value.is_empty() {
            continue;
        }
        let mut value = HeaderValue::from_str(value)
            .map_err(|source| HttpGatewayError::InvalidHeader { name, source })?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[CHARGES_PATH]);
        Ok(self
            .post_json(&url, "POST charges", &ChargePayload::from(request))
            .await?)
    }

    async fn authorize(
        &self,
        request: &ChargeRequest,
    ) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[AUTHORIZATIONS_PATH]);
        Ok(self
            .post_json(&url, "POST authorizations", &ChargePayload::from(request))
            .await?)
    }

    async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[VERIFICATIONS_PATH]);
        let payload = VerificationPayload {
            card: CardPayload::new(&request.card, None),
            address: &request.address,
            client_transaction_id: request.client_transaction_id.as_ref(),
        };
        Ok(self
            .post_json(&url, "POST verifications", &payload)
            .await?)
    }

    async fn transaction(&self, transaction_id: &str) -> Result<TransactionHandle, ProviderError> {
        let url = self.endpoint(&[TRANSACTIONS_PATH, transaction_id]);
        Ok(self.get_json(&url, "GET transactions/{id}").await?)
    }

    async fn capture(
        &self,
        transaction: &TransactionHandle,
        amount: &Money,
    ) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[TRANSACTIONS_PATH, &transaction.transaction_id, "capture"]);
        Ok(self
            .post_json(&url, "POST transactions/{id}/capture", &AmountPayload::from(amount))
            .await?)
    }

    async fn refund(
        &self,
        transaction: &TransactionHandle,
        amount: &Money,
    ) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[TRANSACTIONS_PATH, &transaction.transaction_id, "refund"]);
        Ok(self
            .post_json(&url, "POST transactions/{id}/refund", &AmountPayload::from(amount))
            .await?)
    }

    async fn void(
        &self,
        transaction: &TransactionHandle,
        currency: Option<&str>,
    ) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[TRANSACTIONS_PATH, &transaction.transaction_id, "void"]);
        Ok(self
            .post_json(&url, "POST transactions/{id}/void", &CurrencyPayload { currency })
            .await?)
    }

    async fn reverse(
        &self,
        transaction: &TransactionHandle,
        amount: &Money,
    ) -> Result<TransactionResponse, ProviderError> {
        let url = self.endpoint(&[TRANSACTIONS_PATH, &transaction.transaction_id, "reverse"]);
        Ok(self
            .post_json(&url, "POST transactions/{id}/reverse", &AmountPayload::from(amount))
            .await?)
    }

    async fn close_batch(&self) -> Result<BatchSummary, ProviderError> {
        let url = self.endpoint(&BATCH_CLOSE_PATH);
        Ok(self
            .post_json(&url, "POST batches/close", &serde_json::json!({}))
            .await?)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CardPayload<'a> {
    number: &'a str,
    exp_month: &'a str,
    exp_year: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cvn: Option<&'a str>,
}

impl<'a> CardPayload<'a> {
    fn new(card: &'a CardData, cvn: Option<&'a str>) -> Self {
        Self {
            number: card.number(),
            exp_month: card.exp_month(),
            exp_year: card.exp_year(),
            cvn,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargePayload<'a> {
    amount: Decimal,
    currency: &'a str,
    card: CardPayload<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_transaction_id: Option<&'a ClientReference>,
}

impl<'a> From<&'a ChargeRequest> for ChargePayload<'a> {
    fn from(request: &'a ChargeRequest) -> Self {
        Self {
            amount: request.amount.amount,
            currency: &request.amount.currency,
            card: CardPayload::new(&request.card, request.cvn.as_deref()),
            client_transaction_id: request.client_transaction_id.as_ref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationPayload<'a> {
    card: CardPayload<'a>,
    address: &'a Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_transaction_id: Option<&'a ClientReference>,
}

#[derive(Serialize)]
struct AmountPayload<'a> {
    amount: Decimal,
    currency: &'a str,
}

impl<'a> From<&'a Money> for AmountPayload<'a> {
    fn from(money: &'a Money) -> Self {
        Self {
            amount: money.amount,
            currency: &money.currency,
        }
    }
}

#[derive(Serialize)]
struct CurrencyPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'a str>,
}

/// Builds one [`HttpGateway`] per request, sharing a connection pool.
#[derive(Clone, Debug, Default)]
pub struct HttpGatewayFactory {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpGatewayFactory {
    /// Creates a factory with a fresh client and no timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `client` for every gateway built by this factory.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Applies `timeout` to every provider call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl GatewayFactory for HttpGatewayFactory {
    type Gateway = HttpGateway;

    fn connect(&self, config: &ProviderConfig) -> Result<HttpGateway, ConfigurationError> {
        let gateway = HttpGateway::from_config(config)
            .map_err(|e| ConfigurationError::new(e.to_string()))?
            .with_client(self.client.clone());
        Ok(match self.timeout {
            Some(timeout) => gateway.with_timeout(timeout),
            None => gateway,
        })
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::WARN, error = %err, "Request to provider failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
