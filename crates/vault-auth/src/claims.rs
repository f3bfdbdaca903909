//! Claim sets for authentication assertions and signed data tokens
//!
//! Both claim sets are typed structs that serialize to the exact JSON claim
//! names the vault expects. Optional claims are omitted, not sent empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::ServiceAccountKey;
use crate::error::{AuthError, AuthResult};

/// Lifetime of an authentication assertion (fixed)
pub const ASSERTION_LIFETIME_SECS: i64 = 60 * 60;

/// Lifetime used for signed data tokens when the caller gives none
pub const DEFAULT_SIGNED_TOKEN_TTL_SECS: i64 = 60;

/// Issuer placed in every signed data token
pub const SIGNED_DATA_TOKEN_ISSUER: &str = "sdk";

/// Claims of the JWT-bearer assertion exchanged for a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer: the service account client ID
    pub iss: String,
    /// Key ID registered with the vault
    pub key: String,
    /// Audience: the resolved token URI
    pub aud: String,
    /// Subject: the service account client ID
    pub sub: String,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Caller context, only present when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<String>,
}

impl AssertionClaims {
    /// Build the assertion claims for `key`, bound to `token_uri`
    pub fn new(
        key: &ServiceAccountKey,
        token_uri: &str,
        context: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            iss: key.client_id.clone(),
            key: key.key_id.clone(),
            aud: token_uri.to_string(),
            sub: key.client_id.clone(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
            ctx: non_empty(context),
        }
    }
}

/// Claims of a signed data token wrapping one opaque data token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDataClaims {
    /// Issuer: always `"sdk"`
    pub iss: String,
    /// Key ID registered with the vault
    pub key: String,
    /// Audience: the resolved token URI
    pub aud: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Subject: the service account client ID
    pub sub: String,
    /// The wrapped data token
    pub tok: String,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Caller context, only present when non-empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<String>,
}

impl SignedDataClaims {
    /// Build the claims wrapping `data_token`
    ///
    /// A `time_to_live` of zero or less falls back to
    /// [`DEFAULT_SIGNED_TOKEN_TTL_SECS`].
    ///
    /// # Errors
    /// `InvalidTimeToLive` if `now + time_to_live` overflows a NumericDate.
    pub fn new(
        key: &ServiceAccountKey,
        token_uri: &str,
        data_token: &str,
        time_to_live: i64,
        context: Option<&str>,
        now: DateTime<Utc>,
    ) -> AuthResult<Self> {
        let ttl = effective_ttl(time_to_live);
        let iat = now.timestamp();
        let exp = iat
            .checked_add(ttl)
            .ok_or(AuthError::InvalidTimeToLive(time_to_live))?;

        Ok(Self {
            iss: SIGNED_DATA_TOKEN_ISSUER.to_string(),
            key: key.key_id.clone(),
            aud: token_uri.to_string(),
            iat,
            sub: key.client_id.clone(),
            tok: data_token.to_string(),
            exp,
            ctx: non_empty(context),
        })
    }
}

/// Signed data token lifetime after applying the default
pub fn effective_ttl(time_to_live: i64) -> i64 {
    if time_to_live <= 0 {
        DEFAULT_SIGNED_TOKEN_TTL_SECS
    } else {
        time_to_live
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use serde_json::json;

    fn key() -> ServiceAccountKey {
        ServiceAccountKey {
            client_id: "client-123".to_string(),
            key_id: "key-456".to_string(),
            token_uri: "https://doc.example.com/token".to_string(),
            private_key: SecretString::new(String::new()),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_assertion_claims_without_context() {
        let claims = AssertionClaims::new(&key(), "https://example.com/token", None, now());

        assert_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({
                "iss": "client-123",
                "key": "key-456",
                "aud": "https://example.com/token",
                "sub": "client-123",
                "exp": 1_700_003_600,
            })
        );
    }

    #[test]
    fn test_assertion_claims_empty_context_omitted() {
        let claims = AssertionClaims::new(&key(), "https://example.com/token", Some(""), now());
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("ctx").is_none());

        let claims =
            AssertionClaims::new(&key(), "https://example.com/token", Some("tenant-a"), now());
        assert_eq!(claims.ctx.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn test_signed_data_claims() {
        let claims = SignedDataClaims::new(
            &key(),
            "https://example.com/token",
            "tok-1",
            120,
            Some("ctx-1"),
            now(),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({
                "iss": "sdk",
                "key": "key-456",
                "aud": "https://example.com/token",
                "iat": 1_700_000_000,
                "sub": "client-123",
                "tok": "tok-1",
                "exp": 1_700_000_120,
                "ctx": "ctx-1",
            })
        );
    }

    #[test]
    fn test_signed_data_default_ttl() {
        for ttl in [0, -5] {
            let claims =
                SignedDataClaims::new(&key(), "https://example.com/token", "t", ttl, None, now())
                    .unwrap();
            assert_eq!(claims.exp - claims.iat, DEFAULT_SIGNED_TOKEN_TTL_SECS);
        }
    }

    #[test]
    fn test_signed_data_overlarge_ttl_is_an_error() {
        let err = SignedDataClaims::new(
            &key(),
            "https://example.com/token",
            "t",
            i64::MAX,
            None,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidTimeToLive(i64::MAX)));
    }

    #[test]
    fn test_signed_data_far_future_ttl_is_kept() {
        let ttl = 100_000_000_000_000;
        let claims =
            SignedDataClaims::new(&key(), "https://example.com/token", "t", ttl, None, now())
                .unwrap();
        assert_eq!(claims.exp, 1_700_000_000 + ttl);
    }
}
