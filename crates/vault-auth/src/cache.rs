//! Single-flight bearer token cache
//!
//! [`BearerTokenCache`] holds the last token from a [`TokenSource`] and hands
//! it out until it expires. The expiry check and the refresh run under one
//! async mutex, so any number of concurrent callers cause at most one
//! exchange.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credentials::CredentialSource;
use crate::error::AuthResult;
use crate::exchange::TokenResponse;
use crate::expiry::{expires_at, expiry_seconds};
use crate::options::BearerTokenOptions;
use crate::service_account::ServiceAccount;

/// Anything that can mint a fresh bearer token
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a new token
    async fn fetch_token(&self) -> AuthResult<TokenResponse>;
}

/// [`TokenSource`] backed by a [`ServiceAccount`] and fixed credentials
#[derive(Debug, Clone)]
pub struct ServiceAccountTokenSource {
    account: ServiceAccount,
    credentials: CredentialSource,
    options: BearerTokenOptions,
}

impl ServiceAccountTokenSource {
    /// Source exchanging `credentials` through `account` with `options`
    pub fn new(
        account: ServiceAccount,
        credentials: CredentialSource,
        options: BearerTokenOptions,
    ) -> Self {
        Self {
            account,
            credentials,
            options,
        }
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn fetch_token(&self) -> AuthResult<TokenResponse> {
        self.account
            .bearer_token(&self.credentials, &self.options)
            .await
    }
}

#[derive(Debug)]
struct CachedToken {
    token: TokenResponse,
    fetched_at: Instant,
}

impl CachedToken {
    fn is_usable(&self, fallback_ttl: Option<Duration>) -> bool {
        match expiry_seconds(&self.token.access_token) {
            Some(exp) => exp > Utc::now().timestamp(),
            // Opaque token: only trusted for the fallback window, if any
            None => fallback_ttl.is_some_and(|ttl| self.fetched_at.elapsed() < ttl),
        }
    }
}

/// Caches the token of a [`TokenSource`] until it expires
pub struct BearerTokenCache<S> {
    source: S,
    fallback_ttl: Option<Duration>,
    cached: Mutex<Option<CachedToken>>,
}

impl<S: TokenSource> BearerTokenCache<S> {
    /// Cache in front of `source`
    ///
    /// Tokens without a readable `exp` claim are never reused.
    pub fn new(source: S) -> Self {
        Self {
            source,
            fallback_ttl: None,
            cached: Mutex::new(None),
        }
    }

    /// Reuse tokens without a readable `exp` for `ttl` after they were fetched
    pub fn with_fallback_ttl(mut self, ttl: Duration) -> Self {
        self.fallback_ttl = Some(ttl);
        self
    }

    /// A live token, fetching a new one if the cached token is expired
    ///
    /// # Errors
    /// Whatever the source returns; the previous cached value is dropped.
    pub async fn token(&self) -> AuthResult<TokenResponse> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref()
            && entry.is_usable(self.fallback_ttl)
        {
            debug!("Using cached bearer token");
            return Ok(entry.token.clone());
        }

        *cached = None;
        let token = self.source.fetch_token().await?;
        info!(
            expires_at = ?expires_at(&token.access_token),
            "Refreshed cached bearer token"
        );
        *cached = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }

    /// Drop the cached token so the next call fetches a new one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    /// The underlying source
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S> std::fmt::Debug for BearerTokenCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenCache")
            .field("fallback_ttl", &self.fallback_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#));
        format!("{header}.{payload}.sig")
    }

    fn token_expiring_in(secs: i64) -> String {
        token_with_exp(Utc::now().timestamp() + secs)
    }

    struct CountingSource {
        calls: AtomicUsize,
        token: String,
        fail: bool,
    }

    impl CountingSource {
        fn new(token: String) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                token,
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> AuthResult<TokenResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail {
                return Err(AuthError::Cancelled);
            }
            Ok(TokenResponse {
                access_token: self.token.clone(),
                token_type: "Bearer".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_live_token_is_reused() {
        let cache = BearerTokenCache::new(CountingSource::new(token_expiring_in(300)));

        let first = cache.token().await.unwrap();
        let second = cache.token().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let cache = BearerTokenCache::new(CountingSource::new(token_expiring_in(-10)));

        cache.token().await.unwrap();
        cache.token().await.unwrap();

        assert_eq!(cache.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_opaque_token_without_fallback_is_refreshed() {
        let cache = BearerTokenCache::new(CountingSource::new("opaque".to_string()));

        cache.token().await.unwrap();
        cache.token().await.unwrap();

        assert_eq!(cache.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_opaque_token_with_fallback_ttl() {
        let cache = BearerTokenCache::new(CountingSource::new("opaque".to_string()))
            .with_fallback_ttl(Duration::from_secs(60));

        cache.token().await.unwrap();
        cache.token().await.unwrap();

        assert_eq!(cache.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_exp_beyond_calendar_range_is_reused() {
        // Readable exp that chrono cannot turn into a DateTime
        let token = token_with_exp(9_000_000_000_000_000);
        assert!(expires_at(&token).is_none());

        let cache = BearerTokenCache::new(CountingSource::new(token));
        cache.token().await.unwrap();
        cache.token().await.unwrap();

        assert_eq!(cache.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = BearerTokenCache::new(CountingSource::new(token_expiring_in(300)));

        cache.token().await.unwrap();
        cache.invalidate().await;
        cache.token().await.unwrap();

        assert_eq!(cache.source().calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let mut source = CountingSource::new(token_expiring_in(300));
        source.fail = true;
        let cache = BearerTokenCache::new(source);

        assert!(cache.token().await.is_err());
        assert!(cache.token().await.is_err());
        assert_eq!(cache.source().calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = Arc::new(BearerTokenCache::new(CountingSource::new(
            token_expiring_in(300),
        )));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.token().await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(cache.source().calls(), 1);
    }
}
