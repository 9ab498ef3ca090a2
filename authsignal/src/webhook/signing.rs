//! HMAC-SHA256 signing for Authsignal webhook deliveries.
//!
//! The signature is computed over `{timestamp}.{payload}`, where `payload` is the raw
//! request body exactly as received. The digest is base64-encoded with the trailing
//! `=` padding removed.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the `v2` signature for a payload.
///
/// # Arguments
///
/// * `secret` - The API secret key shared with Authsignal
/// * `timestamp` - Unix timestamp in seconds, as carried in the `t=` token
/// * `payload` - The raw request body, never re-serialized JSON
pub fn compute_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    BASE64_STANDARD.encode(digest).trim_end_matches('=').to_string()
}

/// Returns `true` if `expected` matches any of the candidate signatures.
///
/// Every candidate is compared in full so the time taken does not depend on which one
/// (if any) matched.
pub fn matches_any<S: AsRef<str>>(expected: &str, candidates: &[S]) -> bool {
    candidates
        .iter()
        .fold(false, |found, candidate| constant_time_eq(candidate.as_ref().as_bytes(), expected.as_bytes()) | found)
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
