//! JWT-bearer token exchange
//!
//! Posts a signed assertion to the vault's token endpoint and returns the
//! bearer token. One request per call, no retries, no redirects.
//!
//! ```text
//! POST <tokenURI>
//! Content-Type: application/json
//!
//! {"grant_type":"urn:ietf:params:oauth:grant-type:jwt-bearer","assertion":"<JWT>","scope":" role:..."}
//! ```

pub mod http_client;

use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DEFAULT_REQUEST_TIMEOUT, ExchangeConfig};
use crate::error::{AuthError, AuthResult};
use crate::options::RequestOptions;
use crate::validation::validate_token_uri;

pub use http_client::{HttpClient, HttpClientError, HttpRequest, HttpResponse, ReqwestHttpClient};

/// OAuth 2.0 JWT-bearer grant type (RFC 7523)
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Response header carrying the server's request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Body of the token exchange request
#[derive(Clone, Serialize)]
pub struct TokenRequest<'a> {
    /// Always [`JWT_BEARER_GRANT_TYPE`]
    pub grant_type: &'static str,
    /// Signed assertion
    pub assertion: &'a str,
    /// Role scope, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'a str>,
}

// Manual Debug impl to keep the assertion out of logs
impl std::fmt::Debug for TokenRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("assertion", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Bearer token returned by a successful exchange
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// The bearer token
    pub access_token: String,
    /// Token type, typically `"Bearer"`
    pub token_type: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Error bodies the token endpoint is known to send
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    /// `{"error": {"grpc_code": 3, "http_code": 400, "message": "...", ...}}`
    Detailed { error: ErrorDetail },
    /// `{"error": "invalid_grant", "error_description": "..."}`
    OAuth {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    grpc_code: Option<serde_json::Value>,
    #[serde(default)]
    http_status: Option<String>,
}

/// Posts JWT-bearer assertions to a token endpoint
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: Arc<dyn HttpClient>,
    request_timeout: Duration,
}

impl TokenExchangeClient {
    /// Client using reqwest with `config`
    ///
    /// # Errors
    /// `Network` if the HTTP client cannot be constructed.
    pub fn new(config: &ExchangeConfig) -> AuthResult<Self> {
        let http = ReqwestHttpClient::new(config).map_err(|e| AuthError::Network {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(Self {
            http: Arc::new(http),
            request_timeout: config.request_timeout,
        })
    }

    /// Client sending requests through `http`
    ///
    /// Transport timeouts are reported as [`DEFAULT_REQUEST_TIMEOUT`] unless
    /// [`with_request_timeout`](Self::with_request_timeout) says otherwise.
    pub fn with_http_client(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// The timeout `http` enforces, reported when it fires
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Exchange `assertion` for a bearer token at `token_uri`
    ///
    /// `token_uri` is validated before anything is sent. An empty `scope`
    /// is omitted from the request body.
    ///
    /// # Errors
    /// - `InvalidTokenUri` if `token_uri` is not an absolute https URL
    /// - `Server` for non-2xx responses, `InvalidResponse` for unreadable 2xx bodies
    /// - `Network`, `Timeout` or `Cancelled` if no response arrived
    pub async fn exchange(
        &self,
        token_uri: &str,
        assertion: &str,
        scope: Option<&str>,
        options: &RequestOptions,
    ) -> AuthResult<TokenResponse> {
        let url = validate_token_uri(token_uri)?;
        let request = build_request(&url, assertion, scope)?;

        debug!(
            token_uri = %url,
            scoped = scope.is_some_and(|s| !s.is_empty()),
            "Requesting bearer token"
        );

        let response = self.send(request, options).await?;
        let status = response.status();

        if !status.is_success() {
            let error = server_error(&response);
            warn!(
                token_uri = %url,
                status = status.as_u16(),
                error_code = ?error_code(&error),
                "Token endpoint rejected assertion"
            );
            return Err(error);
        }

        let token: TokenResponse =
            serde_json::from_slice(response.body()).map_err(|e| AuthError::InvalidResponse {
                reason: format!("failed to parse token response: {e}"),
                status: status.as_u16(),
            })?;

        info!(token_uri = %url, token_type = %token.token_type, "Obtained bearer token");
        Ok(token)
    }

    async fn send(&self, request: HttpRequest, options: &RequestOptions) -> AuthResult<HttpResponse> {
        let call = async {
            let result = match options.timeout {
                Some(deadline) => tokio::time::timeout(deadline, self.http.execute(request))
                    .await
                    .map_err(|_| AuthError::Timeout(deadline))?,
                None => self.http.execute(request).await,
            };
            result.map_err(|e| transport_error(e, self.request_timeout))
        };

        match &options.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(AuthError::Cancelled),
                result = call => result,
            },
            None => call.await,
        }
    }
}

fn build_request(url: &Url, assertion: &str, scope: Option<&str>) -> AuthResult<HttpRequest> {
    let body = TokenRequest {
        grant_type: JWT_BEARER_GRANT_TYPE,
        assertion,
        scope: scope.filter(|s| !s.is_empty()),
    };
    let body = serde_json::to_vec(&body)
        .map_err(|e| AuthError::InvalidRequest {
            reason: format!("failed to serialize token request: {e}"),
            source: Some(Box::new(e)),
        })?;

    http::Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .body(body)
        .map_err(|e| AuthError::invalid_token_uri(url.as_str(), e.to_string()))
}

fn transport_error(error: HttpClientError, request_timeout: Duration) -> AuthError {
    if error.is_timeout() {
        return AuthError::Timeout(request_timeout);
    }
    AuthError::Network {
        message: error.to_string(),
        source: Some(Box::new(error)),
    }
}

fn server_error(response: &HttpResponse) -> AuthError {
    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (code, message) = match serde_json::from_slice::<ErrorBody>(response.body()) {
        Ok(ErrorBody::Detailed { error }) => (
            error.grpc_code.map(|c| match c {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            error
                .message
                .or(error.http_status)
                .unwrap_or_else(|| canonical_reason(status)),
        ),
        Ok(ErrorBody::OAuth {
            error,
            error_description,
        }) => {
            let message = error_description.unwrap_or_else(|| error.clone());
            (Some(error), message)
        }
        Err(_) => (None, canonical_reason(status)),
    };

    AuthError::Server {
        status: status.as_u16(),
        code,
        message,
        request_id,
    }
}

fn error_code(error: &AuthError) -> Option<&str> {
    match error {
        AuthError::Server { code, .. } => code.as_deref(),
        _ => None,
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown status")
        .to_string()
}
