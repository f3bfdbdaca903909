//! Common test utilities for integration tests
//!
//! Provides a mock vault token endpoint, fixture keys, temporary credential
//! files and HTTP clients that route the exchange to the mock server.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use vault_auth::exchange::{HttpRequest, HttpResponse};
use vault_auth::{
    ExchangeConfig, HttpClient, HttpClientError, ReqwestHttpClient, ServiceAccount,
    TokenExchangeClient,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

pub const RSA_PKCS8: &str = include_str!("../fixtures/rsa_pkcs8.pem");
pub const RSA_PKCS1: &str = include_str!("../fixtures/rsa_pkcs1.pem");
pub const RSA_PUBLIC: &str = include_str!("../fixtures/rsa_public.pem");
pub const EC_PKCS8: &str = include_str!("../fixtures/ec_pkcs8.pem");

/// Token URI written into test credentials; requests to it are re-targeted
pub const TOKEN_URI: &str = "https://vault.example.com/v1/auth/sa/oauth/token";
pub const TOKEN_PATH: &str = "/v1/auth/sa/oauth/token";

/// Mock vault token endpoint
pub struct MockTokenServer {
    pub server: MockServer,
}

impl MockTokenServer {
    /// Start a new mock token endpoint
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Mock a successful exchange
    pub async fn mock_token_success(&self, access_token: &str, token_type: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accessToken": access_token,
                "tokenType": token_type,
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock a successful exchange answered after `delay`
    pub async fn mock_token_delayed(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accessToken": "late", "tokenType": "Bearer"}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Mock a rejected exchange
    pub async fn mock_token_error(&self, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("x-request-id", "req-test-1")
                    .set_body_json(json!({
                        "error": {
                            "grpc_code": 3,
                            "http_code": status,
                            "message": message,
                            "http_status": "Bad Request",
                            "details": [],
                        }
                    })),
            )
            .mount(&self.server)
            .await;
    }

    /// Bodies of every request the server received, parsed as JSON
    pub async fn received_bodies(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).expect("request body is JSON"))
            .collect()
    }

    /// Service account whose exchanges land on this server
    pub fn service_account(&self) -> ServiceAccount {
        let http = RetargetingHttpClient::new(&self.server.uri());
        ServiceAccount::with_exchange_client(TokenExchangeClient::with_http_client(Arc::new(http)))
    }
}

/// Sends `https://` requests to a plain-HTTP mock server, keeping path and query
#[derive(Debug)]
pub struct RetargetingHttpClient {
    base: String,
    inner: ReqwestHttpClient,
}

impl RetargetingHttpClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            inner: ReqwestHttpClient::new(&ExchangeConfig::default())
                .expect("Failed to create HTTP client"),
        }
    }
}

#[async_trait]
impl HttpClient for RetargetingHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        let (mut parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        parts.uri = format!("{}{}", self.base, path_and_query)
            .parse()
            .map_err(|e| HttpClientError::Other(Box::new(e)))?;
        self.inner
            .execute(http::Request::from_parts(parts, body))
            .await
    }
}

/// Counts requests and refuses to send any of them
#[derive(Debug, Default)]
pub struct CountingHttpClient {
    calls: AtomicUsize,
}

impl CountingHttpClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for CountingHttpClient {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(HttpClientError::Other("network disabled in tests".into()))
    }
}

/// Credential document JSON for the fixture RSA key
pub fn credentials_json(private_key: &str) -> serde_json::Value {
    json!({
        "clientID": "test-client-id",
        "keyID": "test-key-id",
        "tokenURI": TOKEN_URI,
        "privateKey": private_key,
    })
}

/// Credentials written to a temporary file
pub struct CredentialsFile {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl CredentialsFile {
    pub fn write(document: &serde_json::Value) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, document.to_string()).expect("Failed to write credentials");
        Self { dir, path }
    }
}

/// Install a test log subscriber once; honors `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
