//! Per-call options for bearer tokens and signed data tokens

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Options for [`ServiceAccount::generate_bearer_token`](crate::ServiceAccount::generate_bearer_token)
#[derive(Debug, Clone, Default)]
pub struct BearerTokenOptions {
    /// Opaque caller context, sent as the `ctx` claim when non-empty
    pub context: Option<String>,
    /// Roles the token is restricted to, in order
    pub role_ids: Vec<String>,
    /// Token endpoint overriding the credential document's `tokenURI`
    pub token_uri: Option<String>,
    /// Deadline for the exchange request
    pub timeout: Option<Duration>,
    /// Cancels the exchange request when triggered
    pub cancellation: Option<CancellationToken>,
}

impl BearerTokenOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `ctx` claim
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Restrict the token to `role_ids`
    pub fn with_role_ids<I, S>(mut self, role_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.role_ids = role_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Override the token endpoint
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }

    /// Bound the exchange by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort the exchange when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn request_options(&self) -> RequestOptions {
        RequestOptions {
            timeout: self.timeout,
            cancellation: self.cancellation.clone(),
        }
    }
}

/// Options for [`ServiceAccount::generate_signed_data_tokens`](crate::ServiceAccount::generate_signed_data_tokens)
#[derive(Clone, Default)]
pub struct SignedDataTokensOptions {
    /// Data tokens to wrap, in order; must not be empty
    pub data_tokens: Vec<String>,
    /// Lifetime in seconds; zero or less means 60
    pub time_to_live: i64,
    /// Opaque caller context, sent as the `ctx` claim when non-empty
    pub context: Option<String>,
    /// Token endpoint overriding the credential document's `tokenURI`
    pub token_uri: Option<String>,
}

impl SignedDataTokensOptions {
    /// Options wrapping `data_tokens` with the default lifetime
    pub fn new<I, S>(data_tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_tokens: data_tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the lifetime in seconds
    pub fn with_time_to_live(mut self, seconds: i64) -> Self {
        self.time_to_live = seconds;
        self
    }

    /// Set the `ctx` claim
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Override the token endpoint used as audience
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }
}

// Data tokens are sensitive; only their count is shown
impl std::fmt::Debug for SignedDataTokensOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedDataTokensOptions")
            .field("data_tokens", &format_args!("[{} redacted]", self.data_tokens.len()))
            .field("time_to_live", &self.time_to_live)
            .field("context", &self.context)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Deadline and cancellation for a single exchange request
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Deadline for the request
    pub timeout: Option<Duration>,
    /// Cancels the request when triggered
    pub cancellation: Option<CancellationToken>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_builder() {
        let options = BearerTokenOptions::new()
            .with_context("tenant-a")
            .with_role_ids(["admin", "auditor"])
            .with_token_uri("https://override.example.com/token")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(options.context.as_deref(), Some("tenant-a"));
        assert_eq!(options.role_ids, vec!["admin", "auditor"]);
        assert_eq!(
            options.token_uri.as_deref(),
            Some("https://override.example.com/token")
        );
        assert_eq!(
            options.request_options().timeout,
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_signed_data_builder() {
        let options = SignedDataTokensOptions::new(["t1", "t2"]).with_time_to_live(30);
        assert_eq!(options.data_tokens, vec!["t1", "t2"]);
        assert_eq!(options.time_to_live, 30);

        let rendered = format!("{options:?}");
        assert!(rendered.contains("2 redacted"));
        assert!(!rendered.contains("t1"));
    }
}
