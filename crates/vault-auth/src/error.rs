//! Error types for credential parsing, signing and token exchange

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for service-account token operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Boxed error used for transport-level failure sources
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while turning a service-account credential into a token
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credentials file could not be opened or read
    #[error("Credentials file not found or unreadable: {}", path.display())]
    FileNotFound {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The credential text is not a JSON object
    #[error("Invalid credentials format: {reason}")]
    InvalidCredentialsFormat {
        /// What was wrong with the document
        reason: String,
        /// JSON parse failure, if any
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A required credential field is absent, empty or not a string
    #[error("Credentials are missing required field `{0}`")]
    MissingField(&'static str),

    /// The private key is not a PEM private-key block
    #[error("Invalid private key format: {0}")]
    InvalidKeyFormat(String),

    /// The private key DER is neither PKCS#1 nor PKCS#8
    #[error("Unsupported private key encoding: {0}")]
    UnsupportedAlgorithm(String),

    /// The private key decoded as PKCS#8 but is not an RSA key
    #[error("Private key is not an RSA key (algorithm OID {0})")]
    WrongKeyType(String),

    /// The token URI is not an absolute `https` URL with a host
    #[error("Invalid token URI `{uri}`: {reason}")]
    InvalidTokenUri {
        /// The rejected URI
        uri: String,
        /// Why it was rejected
        reason: String,
    },

    /// A signed data token request carried no data tokens
    #[error("At least one data token is required")]
    EmptyDataTokens,

    /// The signed data token lifetime pushes `exp` past the representable range
    #[error("Signed data token lifetime of {0} seconds is out of range")]
    InvalidTimeToLive(i64),

    /// The token exchange request could not be encoded
    #[error("Failed to build token request: {reason}")]
    InvalidRequest {
        /// Description of the failing step
        reason: String,
        /// Underlying encoding failure
        #[source]
        source: Option<BoxError>,
    },

    /// Producing the RS256 signature failed
    #[error("Failed to sign token: {reason}")]
    Signing {
        /// Description of the failing step
        reason: String,
        /// Underlying cryptographic or encoding failure
        #[source]
        source: Option<BoxError>,
    },

    /// The token endpoint answered with a non-2xx status
    #[error("Token endpoint returned {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Machine-readable error code from the response body, if any
        code: Option<String>,
        /// Human-readable message from the response body or status line
        message: String,
        /// Value of the `x-request-id` response header, if any
        request_id: Option<String>,
    },

    /// The token endpoint answered 2xx with a body that is not a token response
    #[error("Invalid token endpoint response: {reason}")]
    InvalidResponse {
        /// What was wrong with the body
        reason: String,
        /// HTTP status code
        status: u16,
    },

    /// The request never completed (connection, TLS or I/O failure)
    #[error("Token request failed: {message}")]
    Network {
        /// Description of the failure
        message: String,
        /// Transport error
        #[source]
        source: Option<BoxError>,
    },

    /// The caller's deadline elapsed before the exchange completed
    #[error("Token request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the exchange
    #[error("Token request was cancelled")]
    Cancelled,
}

/// Stable machine-checkable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// See [`AuthError::FileNotFound`]
    FileNotFound,
    /// See [`AuthError::InvalidCredentialsFormat`]
    InvalidCredentialsFormat,
    /// See [`AuthError::MissingField`]
    MissingField,
    /// See [`AuthError::InvalidKeyFormat`]
    InvalidKeyFormat,
    /// See [`AuthError::UnsupportedAlgorithm`]
    UnsupportedAlgorithm,
    /// See [`AuthError::WrongKeyType`]
    WrongKeyType,
    /// See [`AuthError::InvalidTokenUri`]
    InvalidTokenUri,
    /// See [`AuthError::EmptyDataTokens`]
    EmptyDataTokens,
    /// See [`AuthError::InvalidTimeToLive`]
    InvalidTimeToLive,
    /// See [`AuthError::InvalidRequest`]
    InvalidRequest,
    /// See [`AuthError::Signing`]
    SigningError,
    /// See [`AuthError::Server`]
    ServerError,
    /// See [`AuthError::InvalidResponse`]
    InvalidResponse,
    /// See [`AuthError::Network`]
    NetworkError,
    /// See [`AuthError::Timeout`]
    Timeout,
    /// See [`AuthError::Cancelled`]
    Cancelled,
}

impl ErrorCode {
    /// Snake-case code suitable for logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::FileNotFound => "file_not_found",
            ErrorCode::InvalidCredentialsFormat => "invalid_credentials_format",
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidKeyFormat => "invalid_key_format",
            ErrorCode::UnsupportedAlgorithm => "unsupported_algorithm",
            ErrorCode::WrongKeyType => "wrong_key_type",
            ErrorCode::InvalidTokenUri => "invalid_token_uri",
            ErrorCode::EmptyDataTokens => "empty_data_tokens",
            ErrorCode::InvalidTimeToLive => "invalid_time_to_live",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::SigningError => "signing_error",
            ErrorCode::ServerError => "server_error",
            ErrorCode::InvalidResponse => "invalid_response",
            ErrorCode::NetworkError => "network_error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad failure classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or insecure caller input; fix the input, never retry
    Input,
    /// Local signing failure
    Crypto,
    /// The token endpoint rejected or garbled the exchange
    Server,
    /// The request never reached, or never came back from, the server
    Network,
}

impl AuthError {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::FileNotFound { .. } => ErrorCode::FileNotFound,
            AuthError::InvalidCredentialsFormat { .. } => ErrorCode::InvalidCredentialsFormat,
            AuthError::MissingField(_) => ErrorCode::MissingField,
            AuthError::InvalidKeyFormat(_) => ErrorCode::InvalidKeyFormat,
            AuthError::UnsupportedAlgorithm(_) => ErrorCode::UnsupportedAlgorithm,
            AuthError::WrongKeyType(_) => ErrorCode::WrongKeyType,
            AuthError::InvalidTokenUri { .. } => ErrorCode::InvalidTokenUri,
            AuthError::EmptyDataTokens => ErrorCode::EmptyDataTokens,
            AuthError::InvalidTimeToLive(_) => ErrorCode::InvalidTimeToLive,
            AuthError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            AuthError::Signing { .. } => ErrorCode::SigningError,
            AuthError::Server { .. } => ErrorCode::ServerError,
            AuthError::InvalidResponse { .. } => ErrorCode::InvalidResponse,
            AuthError::Network { .. } => ErrorCode::NetworkError,
            AuthError::Timeout(_) => ErrorCode::Timeout,
            AuthError::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Failure class for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::FileNotFound { .. }
            | AuthError::InvalidCredentialsFormat { .. }
            | AuthError::MissingField(_)
            | AuthError::InvalidKeyFormat(_)
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::WrongKeyType(_)
            | AuthError::InvalidTokenUri { .. }
            | AuthError::EmptyDataTokens
            | AuthError::InvalidTimeToLive(_)
            | AuthError::InvalidRequest { .. } => ErrorCategory::Input,
            AuthError::Signing { .. } => ErrorCategory::Crypto,
            AuthError::Server { .. } | AuthError::InvalidResponse { .. } => ErrorCategory::Server,
            AuthError::Network { .. } | AuthError::Timeout(_) | AuthError::Cancelled => {
                ErrorCategory::Network
            }
        }
    }

    /// Whether a caller may reasonably retry the same call
    ///
    /// Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::Network { .. } | AuthError::Timeout(_) => true,
            AuthError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn invalid_token_uri(uri: &str, reason: impl Into<String>) -> Self {
        AuthError::InvalidTokenUri {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn signing(
        reason: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        AuthError::Signing {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }
}
