//! # Vault Auth - Service Account Tokens
//!
//! Turns a service-account credential document into tokens for a vault
//! API: RS256-signed JWT-bearer assertions exchanged for bearer tokens, and
//! locally signed data tokens.
//!
//! ## Key Features
//!
//! - **Credentials** - JSON key files or inline JSON with `clientID`, `keyID`,
//!   `tokenURI` and `privateKey`
//! - **RSA keys** - PKCS#1 and PKCS#8 PEM, non-RSA keys rejected by OID
//! - **Bearer tokens** - RFC 7523 JWT-bearer exchange with role scopes
//! - **Signed data tokens** - per-token RS256 wrappers with a short lifetime
//! - **Expiry checks** - local, unverified `exp` inspection that fails closed
//! - **Caching** - single-flight [`BearerTokenCache`]
//!
//! ## Architecture
//!
//! - [`credentials`] - Credential document loading and required fields
//! - [`key`] - PEM/DER RSA private key parsing
//! - [`claims`] - Assertion and signed data token claim sets
//! - [`signer`] - RS256 compact JWT signing
//! - [`exchange`] - Token endpoint client over a pluggable [`HttpClient`]
//! - [`expiry`] - Bearer token expiry evaluation
//! - [`scope`] - Role scope composition
//! - [`validation`] - Token URI checks
//! - [`service_account`] - The [`ServiceAccount`] facade
//! - [`cache`] - Token caching
//!
//! ## Quick Start
//!
//! ```no_run
//! use vault_auth::{BearerTokenOptions, ServiceAccount, SignedDataTokensOptions, is_expired};
//!
//! # async fn run() -> vault_auth::AuthResult<()> {
//! let account = ServiceAccount::new()?;
//!
//! let options = BearerTokenOptions::new()
//!     .with_context("tenant-a")
//!     .with_role_ids(["role-id-1", "role-id-2"]);
//! let token = account.generate_bearer_token("credentials.json", &options).await?;
//! if is_expired(&token.access_token) {
//!     // fetch again
//! }
//!
//! let signed = account.generate_signed_data_tokens(
//!     "credentials.json",
//!     &SignedDataTokensOptions::new(["data-token-1"]).with_time_to_live(60),
//! )?;
//! assert_eq!(signed.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! - Token URIs must be absolute `https` URLs, overrides included
//! - Redirects are never followed
//! - Private keys, assertions and tokens are redacted from `Debug` and logs

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod claims;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod expiry;
pub mod key;
pub mod options;
pub mod scope;
pub mod service_account;
pub mod signer;
pub mod validation;

pub use cache::{BearerTokenCache, ServiceAccountTokenSource, TokenSource};
pub use claims::{AssertionClaims, SignedDataClaims};
pub use config::ExchangeConfig;
pub use credentials::{CredentialDocument, CredentialSource, ServiceAccountKey};
pub use error::{AuthError, AuthResult, ErrorCategory, ErrorCode};
pub use exchange::{
    HttpClient, HttpClientError, JWT_BEARER_GRANT_TYPE, ReqwestHttpClient, TokenExchangeClient,
    TokenResponse,
};
pub use expiry::{expires_at, is_expired};
pub use key::{KeyEncoding, RsaSigningKey, parse_private_key};
pub use options::{BearerTokenOptions, RequestOptions, SignedDataTokensOptions};
pub use scope::compose_role_scope;
pub use service_account::{SIGNED_TOKEN_PREFIX, ServiceAccount, SignedDataTokenResult};
pub use signer::TokenSigner;
pub use validation::{base_url, validate_token_uri};
