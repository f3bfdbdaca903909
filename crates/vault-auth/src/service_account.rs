//! Service account facade
//!
//! Ties credential resolution, key parsing, claim building, signing and the
//! token exchange together. Every local check runs before the network is
//! touched.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::claims::{AssertionClaims, SignedDataClaims, effective_ttl};
use crate::config::ExchangeConfig;
use crate::credentials::{CredentialDocument, CredentialSource};
use crate::error::{AuthError, AuthResult};
use crate::exchange::{TokenExchangeClient, TokenResponse};
use crate::key::parse_private_key;
use crate::options::{BearerTokenOptions, SignedDataTokensOptions};
use crate::scope::compose_role_scope;
use crate::signer::TokenSigner;
use crate::validation::resolve_token_uri;

/// Prefix prepended to every signed data token
pub const SIGNED_TOKEN_PREFIX: &str = "signed_token_";

/// One data token and its signed counterpart
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDataTokenResult {
    /// The data token as supplied
    pub original_token: String,
    /// [`SIGNED_TOKEN_PREFIX`] followed by the compact JWT
    pub signed_token: String,
}

impl std::fmt::Debug for SignedDataTokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedDataTokenResult")
            .field("original_token", &"[REDACTED]")
            .field("signed_token", &"[REDACTED]")
            .finish()
    }
}

/// Entry point for bearer tokens and signed data tokens
///
/// # Example
///
/// ```no_run
/// use vault_auth::{BearerTokenOptions, ServiceAccount};
///
/// # async fn run() -> vault_auth::AuthResult<()> {
/// let account = ServiceAccount::new()?;
/// let options = BearerTokenOptions::new().with_role_ids(["role-id-1"]);
/// let token = account
///     .generate_bearer_token("credentials.json", &options)
///     .await?;
/// println!("{}", token.token_type);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    exchange: TokenExchangeClient,
}

impl ServiceAccount {
    /// Service account client with the default [`ExchangeConfig`]
    ///
    /// # Errors
    /// `Network` if the HTTP client cannot be constructed.
    pub fn new() -> AuthResult<Self> {
        Self::with_config(&ExchangeConfig::default())
    }

    /// Service account client with `config`
    ///
    /// # Errors
    /// `Network` if the HTTP client cannot be constructed.
    pub fn with_config(config: &ExchangeConfig) -> AuthResult<Self> {
        Ok(Self::with_exchange_client(TokenExchangeClient::new(config)?))
    }

    /// Service account client sending exchanges through `exchange`
    pub fn with_exchange_client(exchange: TokenExchangeClient) -> Self {
        Self { exchange }
    }

    /// Exchange the credentials file at `path` for a bearer token
    ///
    /// # Errors
    /// Any credential, key, URI or signing error before the request is
    /// sent, then `Server`, `InvalidResponse`, `Network`, `Timeout` or
    /// `Cancelled` from the exchange.
    pub async fn generate_bearer_token(
        &self,
        path: impl AsRef<Path>,
        options: &BearerTokenOptions,
    ) -> AuthResult<TokenResponse> {
        let document = CredentialDocument::from_file(path)?;
        self.bearer_token_for(&document, options).await
    }

    /// Exchange inline credentials JSON for a bearer token
    ///
    /// # Errors
    /// As [`ServiceAccount::generate_bearer_token`], minus `FileNotFound`.
    pub async fn generate_bearer_token_from_creds(
        &self,
        credentials: &str,
        options: &BearerTokenOptions,
    ) -> AuthResult<TokenResponse> {
        let document = CredentialDocument::from_json_str(credentials)?;
        self.bearer_token_for(&document, options).await
    }

    /// Exchange credentials from `source` for a bearer token
    ///
    /// # Errors
    /// As [`ServiceAccount::generate_bearer_token`].
    pub async fn bearer_token(
        &self,
        source: &CredentialSource,
        options: &BearerTokenOptions,
    ) -> AuthResult<TokenResponse> {
        let document = source.load()?;
        self.bearer_token_for(&document, options).await
    }

    async fn bearer_token_for(
        &self,
        document: &CredentialDocument,
        options: &BearerTokenOptions,
    ) -> AuthResult<TokenResponse> {
        let key = document.service_account_key()?;
        let token_uri = resolve_token_uri(options.token_uri.as_deref(), &key.token_uri)?;
        let signing_key = parse_private_key(key.private_key_pem())?;

        let claims = AssertionClaims::new(&key, token_uri, options.context.as_deref(), Utc::now());
        let assertion = TokenSigner::new(&signing_key)?.sign(&claims)?;
        let scope = compose_role_scope(&options.role_ids);

        debug!(
            client_id = %key.client_id,
            key_id = %key.key_id,
            roles = options.role_ids.len(),
            "Signed service account assertion"
        );

        self.exchange
            .exchange(token_uri, &assertion, Some(scope.as_str()), &options.request_options())
            .await
    }

    /// Sign each data token with the key in the credentials file at `path`
    ///
    /// # Errors
    /// `EmptyDataTokens` before anything is read, then any credential, key,
    /// URI or signing error. The first signing failure aborts the batch.
    pub fn generate_signed_data_tokens(
        &self,
        path: impl AsRef<Path>,
        options: &SignedDataTokensOptions,
    ) -> AuthResult<Vec<SignedDataTokenResult>> {
        ensure_data_tokens(options)?;
        let document = CredentialDocument::from_file(path)?;
        sign_data_tokens(&document, options)
    }

    /// Sign each data token with the key in inline credentials JSON
    ///
    /// # Errors
    /// As [`ServiceAccount::generate_signed_data_tokens`], minus `FileNotFound`.
    pub fn generate_signed_data_tokens_from_creds(
        &self,
        credentials: &str,
        options: &SignedDataTokensOptions,
    ) -> AuthResult<Vec<SignedDataTokenResult>> {
        ensure_data_tokens(options)?;
        let document = CredentialDocument::from_json_str(credentials)?;
        sign_data_tokens(&document, options)
    }
}

fn ensure_data_tokens(options: &SignedDataTokensOptions) -> AuthResult<()> {
    if options.data_tokens.is_empty() {
        return Err(AuthError::EmptyDataTokens);
    }
    Ok(())
}

fn sign_data_tokens(
    document: &CredentialDocument,
    options: &SignedDataTokensOptions,
) -> AuthResult<Vec<SignedDataTokenResult>> {
    let key = document.service_account_key()?;
    let token_uri = resolve_token_uri(options.token_uri.as_deref(), &key.token_uri)?;
    let signer = TokenSigner::new(&parse_private_key(key.private_key_pem())?)?;

    let now = Utc::now();
    let results = options
        .data_tokens
        .iter()
        .map(|data_token| {
            let claims = SignedDataClaims::new(
                &key,
                token_uri,
                data_token,
                options.time_to_live,
                options.context.as_deref(),
                now,
            )?;
            signer.sign(&claims).map(|jwt| SignedDataTokenResult {
                original_token: data_token.clone(),
                signed_token: format!("{SIGNED_TOKEN_PREFIX}{jwt}"),
            })
        })
        .collect::<AuthResult<Vec<_>>>()?;

    info!(
        count = results.len(),
        ttl_secs = effective_ttl(options.time_to_live),
        "Signed data tokens"
    );
    Ok(results)
}
