//! Local bearer-token expiry checks
//!
//! The token's claims are read *without* verifying its signature. No server
//! key is available here and nothing is being asserted about authenticity;
//! the only question answered is whether the embedded `exp` has passed.
//! Anything that cannot be read is treated as expired.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Whether `token` should be treated as expired right now
///
/// Empty, malformed, `exp`-less and non-numeric-`exp` tokens are expired.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

/// Whether `token` is expired at `now`
///
/// A token is live only when its `exp` is strictly after `now`.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    if token.is_empty() {
        return true;
    }

    match expiry_seconds(token) {
        Some(exp) => exp <= now.timestamp(),
        None => {
            debug!("Bearer token has no readable exp claim; treating as expired");
            true
        }
    }
}

/// The `exp` claim of `token` as a timestamp, if it can be read
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    expiry_seconds(token).and_then(|exp| DateTime::from_timestamp(exp, 0))
}

/// The raw `exp` claim of `token` in seconds, if it can be read
pub(crate) fn expiry_seconds(token: &str) -> Option<i64> {
    let claims = decode_unverified_claims(token)?;
    numeric_date(claims.get("exp")?)
}

/// Structurally parse a compact JWT and return its claim set
fn decode_unverified_claims(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.split('.');
    let (header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    // The header must be a JSON object too, otherwise this is not a JWT
    decode_segment(header)?;
    decode_segment(payload)
}

fn decode_segment(segment: &str) -> Option<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// RFC 7519 NumericDate: integer or fractional seconds since the epoch
fn numeric_date(value: &Value) -> Option<i64> {
    let number = value.as_number()?;
    if let Some(secs) = number.as_i64() {
        return Some(secs);
    }
    if let Some(secs) = number.as_u64() {
        return Some(i64::try_from(secs).unwrap_or(i64::MAX));
    }
    number
        .as_f64()
        .filter(|secs| secs.is_finite())
        .map(|secs| secs.floor() as i64)
}
