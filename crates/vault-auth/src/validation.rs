//! Token URI validation
//!
//! Assertions are only ever sent to an absolute `https` URL with a host.
//! The check runs on whichever URI wins resolution, so a per-call override
//! cannot downgrade the transport.

use url::Url;

use crate::error::{AuthError, AuthResult};

/// Validate that `uri` is an absolute `https` URL with a non-empty host
///
/// # Errors
/// `InvalidTokenUri` naming the URI and the reason.
pub fn validate_token_uri(uri: &str) -> AuthResult<Url> {
    let parsed = Url::parse(uri)
        .map_err(|e| AuthError::invalid_token_uri(uri, format!("not an absolute URL: {e}")))?;

    if parsed.scheme() != "https" {
        return Err(AuthError::invalid_token_uri(
            uri,
            format!("scheme must be https, found {}", parsed.scheme()),
        ));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(AuthError::invalid_token_uri(uri, "URL has no host")),
    }
}

/// Pick the token URI for a call and validate it
///
/// A non-empty `override_uri` wins over the document's `document_uri`.
/// The winner is returned verbatim, since it doubles as the `aud` claim.
///
/// # Errors
/// `InvalidTokenUri` if the chosen URI fails [`validate_token_uri`].
pub fn resolve_token_uri<'a>(
    override_uri: Option<&'a str>,
    document_uri: &'a str,
) -> AuthResult<&'a str> {
    let uri = match override_uri {
        Some(uri) if !uri.is_empty() => uri,
        _ => document_uri,
    };
    validate_token_uri(uri)?;
    Ok(uri)
}

/// Scheme and authority of a token URI, e.g. `https://manage.example.com`
///
/// # Errors
/// `InvalidTokenUri` if `uri` fails [`validate_token_uri`].
pub fn base_url(uri: &str) -> AuthResult<String> {
    let parsed = validate_token_uri(uri)?;
    let host = parsed.host_str().unwrap_or_default();
    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}
