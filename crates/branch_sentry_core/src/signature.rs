//! GitHub webhook signature verification.
//!
//! GitHub signs every delivery with an HMAC of the raw request body, keyed with the
//! webhook secret. The SHA-256 signature arrives in `X-Hub-Signature-256` as
//! `sha256=<hex>`; older installations only send the SHA-1 signature in
//! `X-Hub-Signature` as `sha1=<hex>`. When both are present only the SHA-256 one is
//! checked.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use thiserror::Error;

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Header carrying the HMAC-SHA256 signature.
pub const SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";

/// Legacy header carrying the HMAC-SHA1 signature.
pub const SIGNATURE_SHA1_HEADER: &str = "X-Hub-Signature";

/// Hash function behind a signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sha256,
    Sha1,
}

impl SignatureAlgorithm {
    /// Prefix GitHub puts in front of the hex digest.
    pub fn prefix(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha256 => "sha256=",
            SignatureAlgorithm::Sha1 => "sha1=",
        }
    }
}

/// Reasons a delivery fails signature verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("no signature header present")]
    Missing,

    #[error("signature header does not start with '{expected}'")]
    UnsupportedPrefix { expected: &'static str },

    #[error("signature is not valid hex")]
    InvalidHex,

    #[error("signature does not match the payload")]
    Mismatch,

    #[error("webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

/// Parses a signature header value into the raw digest bytes.
///
/// # Examples
///
/// ```
/// use branch_sentry_core::signature::{parse_signature_header, SignatureAlgorithm};
///
/// let digest = parse_signature_header("sha256=1234abcd", SignatureAlgorithm::Sha256).unwrap();
/// assert_eq!(digest, vec![0x12, 0x34, 0xab, 0xcd]);
///
/// assert!(parse_signature_header("sha1=1234abcd", SignatureAlgorithm::Sha256).is_err());
/// ```
pub fn parse_signature_header(
    header: &str,
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let hex_sig = header
        .trim()
        .strip_prefix(algorithm.prefix())
        .ok_or(SignatureError::UnsupportedPrefix {
            expected: algorithm.prefix(),
        })?;

    hex::decode(hex_sig).map_err(|_| SignatureError::InvalidHex)
}

/// Computes the HMAC of `payload` keyed with `secret`.
pub fn compute_signature(
    payload: &[u8],
    secret: &[u8],
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let digest = match algorithm {
        SignatureAlgorithm::Sha256 => {
            let mut mac =
                HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
        SignatureAlgorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(digest)
}

/// Formats a digest as a GitHub signature header value, e.g. `sha256=<hex>`.
pub fn format_signature_header(signature: &[u8], algorithm: SignatureAlgorithm) -> String {
    format!("{}{}", algorithm.prefix(), hex::encode(signature))
}

/// Verifies a delivery against the webhook secret.
///
/// `signature_256` and `signature_sha1` are the raw values of the
/// `X-Hub-Signature-256` and `X-Hub-Signature` headers. Returns the algorithm that
/// was checked. The digest comparison is constant time.
///
/// # Examples
///
/// ```
/// use branch_sentry_core::signature::{
///     compute_signature, format_signature_header, verify_signature, SignatureAlgorithm,
/// };
///
/// let payload = b"{\"zen\":\"Keep it logically awesome.\"}";
/// let secret = b"my-secret-key";
///
/// let digest = compute_signature(payload, secret, SignatureAlgorithm::Sha256).unwrap();
/// let header = format_signature_header(&digest, SignatureAlgorithm::Sha256);
///
/// assert!(verify_signature(payload, Some(&header), None, secret).is_ok());
/// assert!(verify_signature(payload, Some(&header), None, b"wrong-secret").is_err());
/// ```
pub fn verify_signature(
    payload: &[u8],
    signature_256: Option<&str>,
    signature_sha1: Option<&str>,
    secret: &[u8],
) -> Result<SignatureAlgorithm, SignatureError> {
    let (header, algorithm) = match (signature_256, signature_sha1) {
        (Some(header), _) => (header, SignatureAlgorithm::Sha256),
        (None, Some(header)) => (header, SignatureAlgorithm::Sha1),
        (None, None) => return Err(SignatureError::Missing),
    };

    let expected = parse_signature_header(header, algorithm)?;

    let matched = match algorithm {
        SignatureAlgorithm::Sha256 => {
            let mut mac =
                HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
            mac.update(payload);
            mac.verify_slice(&expected).is_ok()
        }
        SignatureAlgorithm::Sha1 => {
            let mut mac = HmacSha1::new_from_slice(secret).map_err(|_| SignatureError::InvalidKey)?;
            mac.update(payload);
            mac.verify_slice(&expected).is_ok()
        }
    };

    if matched {
        Ok(algorithm)
    } else {
        Err(SignatureError::Mismatch)
    }
}
