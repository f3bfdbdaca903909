//! RS256 token signing

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use crate::error::{AuthError, AuthResult};
use crate::key::RsaSigningKey;

/// Signs claim sets into compact RS256 JWTs
///
/// The PKCS#1 conversion happens once per signer, so a batch of signed
/// data tokens re-uses the same encoding key.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    header: Header,
}

impl TokenSigner {
    /// Prepare a signer for `key`
    ///
    /// # Errors
    /// `Signing` if the key cannot be converted for the JWT library.
    pub fn new(key: &RsaSigningKey) -> AuthResult<Self> {
        Ok(Self {
            encoding_key: key.encoding_key()?,
            header: Header::new(Algorithm::RS256),
        })
    }

    /// Sign `claims` into a compact JWT
    ///
    /// # Errors
    /// `Signing` wrapping the serialization or RSA failure.
    pub fn sign<C: Serialize>(&self, claims: &C) -> AuthResult<String> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| AuthError::signing("RS256 signing failed", e))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("alg", &self.header.alg)
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}
