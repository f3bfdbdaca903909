//! RSA private key extraction
//!
//! Service-account key files in the wild carry either a PKCS#1
//! `RSAPrivateKey` or a PKCS#8 `PrivateKeyInfo`, sometimes under a label
//! that does not match the encoding. The parser tries PKCS#1 first, then
//! PKCS#8, and only then rejects the key.

use jsonwebtoken::EncodingKey;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::PrivateKeyInfo;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// PEM labels accepted as a private-key block
const PRIVATE_KEY_LABELS: [&str; 2] = ["PRIVATE KEY", "RSA PRIVATE KEY"];

/// DER encoding the key was recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// PKCS#1 `RSAPrivateKey`
    Pkcs1,
    /// PKCS#8 `PrivateKeyInfo` wrapping an RSA key
    Pkcs8,
}

/// An RSA private key ready to sign RS256 tokens
#[derive(Clone)]
pub struct RsaSigningKey {
    inner: RsaPrivateKey,
    encoding: KeyEncoding,
}

impl RsaSigningKey {
    /// Encoding the key was stored in
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// The underlying RSA key
    pub fn rsa_key(&self) -> &RsaPrivateKey {
        &self.inner
    }

    /// Convert into the `jsonwebtoken` signing key (PKCS#1 DER)
    pub(crate) fn encoding_key(&self) -> AuthResult<EncodingKey> {
        let der = self
            .inner
            .to_pkcs1_der()
            .map_err(|e| AuthError::signing("failed to encode RSA key as PKCS#1", e.to_string()))?;
        Ok(EncodingKey::from_rsa_der(der.as_bytes()))
    }
}

impl std::fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("encoding", &self.encoding)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Decode a PEM-armored RSA private key
///
/// # Errors
/// - `InvalidKeyFormat` if the text is not PEM or the block is not a private key
/// - `UnsupportedAlgorithm` if the DER is neither PKCS#1 nor PKCS#8
/// - `WrongKeyType` if the PKCS#8 key is not RSA (for example an EC key)
pub fn parse_private_key(pem_text: &str) -> AuthResult<RsaSigningKey> {
    let block = pem::parse(pem_text.trim())
        .map_err(|e| AuthError::InvalidKeyFormat(format!("failed to decode PEM block: {e}")))?;

    if !PRIVATE_KEY_LABELS.contains(&block.tag()) {
        return Err(AuthError::InvalidKeyFormat(format!(
            "expected a PRIVATE KEY block, found {}",
            block.tag()
        )));
    }

    let key = parse_private_key_der(block.contents())?;
    debug!(encoding = ?key.encoding, "Parsed service account private key");
    Ok(key)
}

/// Decode a DER private key, PKCS#1 first and PKCS#8 second
///
/// # Errors
/// Same as [`parse_private_key`] minus the PEM checks.
pub fn parse_private_key_der(der: &[u8]) -> AuthResult<RsaSigningKey> {
    if let Ok(inner) = RsaPrivateKey::from_pkcs1_der(der) {
        return Ok(RsaSigningKey {
            inner,
            encoding: KeyEncoding::Pkcs1,
        });
    }

    let info = PrivateKeyInfo::try_from(der).map_err(|e| {
        AuthError::UnsupportedAlgorithm(format!(
            "key is neither PKCS#1 nor PKCS#8 encoded: {e}"
        ))
    })?;

    if info.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(AuthError::WrongKeyType(info.algorithm.oid.to_string()));
    }

    let inner = RsaPrivateKey::try_from(info)
        .map_err(|e| AuthError::InvalidKeyFormat(format!("malformed PKCS#8 RSA key: {e}")))?;

    Ok(RsaSigningKey {
        inner,
        encoding: KeyEncoding::Pkcs8,
    })
}
