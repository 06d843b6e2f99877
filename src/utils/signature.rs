//! Verification of signed call-platform webhooks.
//!
//! The platform signs every webhook body with the account API key and sends
//! the result in the `x-retell-signature` header:
//!
//! ```text
//! x-retell-signature: v=<unix-millis>,d=<hex hmac-sha256(api_key, body || unix-millis)>
//! ```
//!
//! A signature is accepted only when the digest matches and the timestamp is
//! within [`SIGNATURE_TOLERANCE`] of the local clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-retell-signature";

/// Maximum allowed distance between the signed timestamp and now.
pub const SIGNATURE_TOLERANCE: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    Malformed,
    #[error("signature timestamp is outside the accepted window")]
    Expired,
    #[error("signature digest does not match")]
    Mismatch,
    #[error("signing key is empty")]
    EmptyKey,
}

/// Check `signature` against `body` using the current wall clock.
pub fn verify_signature(body: &[u8], api_key: &str, signature: &str) -> Result<(), SignatureError> {
    verify_signature_at(body, api_key, signature, unix_millis_now())
}

/// Check `signature` against `body` as if the current time were `now_ms`.
pub fn verify_signature_at(
    body: &[u8],
    api_key: &str,
    signature: &str,
    now_ms: u64,
) -> Result<(), SignatureError> {
    if api_key.is_empty() {
        return Err(SignatureError::EmptyKey);
    }

    let (timestamp, digest) = parse_signature(signature)?;

    if now_ms.abs_diff(timestamp) > SIGNATURE_TOLERANCE.as_millis() as u64 {
        return Err(SignatureError::Expired);
    }

    let expected = compute_digest(body, api_key, timestamp)?;
    if expected.as_bytes().ct_eq(digest.to_ascii_lowercase().as_bytes()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Produce a header value in the platform's format.
///
/// Used by tests and local tooling that replay webhooks against the server.
pub fn sign(body: &[u8], api_key: &str, timestamp_ms: u64) -> Result<String, SignatureError> {
    let digest = compute_digest(body, api_key, timestamp_ms)?;
    Ok(format!("v={timestamp_ms},d={digest}"))
}

fn compute_digest(body: &[u8], api_key: &str, timestamp_ms: u64) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(api_key.as_bytes()).map_err(|_| SignatureError::EmptyKey)?;
    mac.update(body);
    mac.update(timestamp_ms.to_string().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn parse_signature(signature: &str) -> Result<(u64, &str), SignatureError> {
    let mut timestamp = None;
    let mut digest = None;

    for part in signature.trim().split(',') {
        match part.trim().split_once('=') {
            Some(("v", value)) => {
                timestamp = Some(value.parse::<u64>().map_err(|_| SignatureError::Malformed)?)
            }
            Some(("d", value)) if !value.is_empty() => digest = Some(value),
            _ => return Err(SignatureError::Malformed),
        }
    }

    match (timestamp, digest) {
        (Some(timestamp), Some(digest)) => Ok((timestamp, digest)),
        _ => Err(SignatureError::Malformed),
    }
}

pub(crate) fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
