//! Transport used by the token exchange
//!
//! [`TokenExchangeClient`](super::TokenExchangeClient) hands a complete
//! `http::Request<Vec<u8>>` to an [`HttpClient`] and gets the whole response
//! back. [`ReqwestHttpClient`] sends it over rustls with redirects turned
//! off, since the assertion is bound to the token URI as its audience.

use async_trait::async_trait;
use http::{HeaderValue, StatusCode};
use std::error::Error as StdError;

use crate::config::ExchangeConfig;

/// HTTP request as sent by the exchange
pub type HttpRequest = http::Request<Vec<u8>>;
/// HTTP response as consumed by the exchange
pub type HttpResponse = http::Response<Vec<u8>>;

/// Executes one HTTP request
#[async_trait]
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    /// Send `request` and return the complete response
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError>;
}

/// reqwest-backed [`HttpClient`]
#[derive(Clone)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Build a client from `config` with redirects disabled
    ///
    /// # Errors
    /// Returns the reqwest builder error (for example, TLS backend setup).
    pub fn new(config: &ExchangeConfig) -> Result<Self, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { inner })
    }

    /// Use a caller-built reqwest client as is
    ///
    /// Its redirect policy is not touched; build it with
    /// `redirect::Policy::none()` to keep assertions on the token URI.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        let (parts, body) = request.into_parts();
        let url = parts.uri.to_string();

        let response = self
            .inner
            .request(parts.method, &url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| HttpClientError::InvalidResponse(format!("status line: {e}")))?;

        let mut builder = http::Response::builder().status(status);

        for (name, value) in response.headers() {
            let header_value = HeaderValue::from_bytes(value.as_bytes())
                .map_err(|e| HttpClientError::InvalidResponse(e.to_string()))?;
            builder = builder.header(name.as_str(), header_value);
        }

        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::BodyRead(e.to_string()))?;

        builder
            .body(body_bytes.to_vec())
            .map_err(|e| HttpClientError::InvalidResponse(e.to_string()))
    }
}

impl std::fmt::Debug for ReqwestHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestHttpClient")
            .field("inner", &"<reqwest::Client>")
            .finish()
    }
}

/// Why a token request got no usable response
#[derive(Debug)]
pub enum HttpClientError {
    /// reqwest could not connect, send or receive
    Request(reqwest::Error),

    /// The transport gave up after its own deadline
    Timeout,

    /// Status or headers could not be carried over into `http` types
    InvalidResponse(String),

    /// The connection dropped while the body was streaming
    BodyRead(String),

    /// Failure reported by a custom [`HttpClient`]
    Other(Box<dyn StdError + Send + Sync>),
}

impl HttpClientError {
    /// Whether the transport's own timeout fired
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout(),
            Self::Timeout => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for HttpClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(e) => write!(f, "token endpoint unreachable: {e}"),
            Self::Timeout => f.write_str("token endpoint did not answer in time"),
            Self::InvalidResponse(msg) => write!(f, "unusable token endpoint response: {msg}"),
            Self::BodyRead(msg) => write!(f, "token response body cut short: {msg}"),
            Self::Other(e) => write!(f, "token request transport: {e}"),
        }
    }
}

impl StdError for HttpClientError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            Self::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}
