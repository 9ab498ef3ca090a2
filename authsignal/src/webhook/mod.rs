//! Verification of signed webhook deliveries.
//!
//! - [`signature`]: parsing of the `t=...,v2=...` signature header
//! - [`signing`]: HMAC-SHA256 signature computation
//! - [`events`]: the decoded event payload
//!
//! A delivery is accepted when its header carries a timestamp inside the tolerance window
//! and at least one `v2` signature equal to `base64(HMAC-SHA256(secret, "{t}.{body}"))`.
//!
//! ```no_run
//! use authsignal::webhook::Webhook;
//!
//! # fn handle(body: &str, header: &str) -> Result<(), authsignal::webhook::VerifyError> {
//! let webhook = Webhook::new("api-secret-key");
//! let event = webhook.construct_event(body, header, None)?;
//! println!("{} {}", event.event_type, event.id);
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod signature;
pub mod signing;

use chrono::Utc;
use thiserror::Error;

pub use events::WebhookEvent;
pub use signature::SignatureHeader;
pub use signing::compute_signature;

/// Name of the HTTP header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-signature-v2";

/// Default tolerance (in minutes) between the signed timestamp and the current time.
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 5;

/// Reasons a webhook delivery is rejected.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Header is missing the timestamp or every `v2` signature
    #[error("Signature format is invalid.")]
    InvalidFormat,

    /// Signed timestamp is older than the tolerance window
    #[error("Timestamp is outside the tolerance zone.")]
    TimestampOutOfTolerance,

    /// No candidate signature matches the computed one
    #[error("Signature mismatch.")]
    SignatureMismatch,

    /// Payload is authentic but is not a valid event
    #[error("Invalid webhook payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Verify a webhook delivery and decode its event.
///
/// # Arguments
/// * `payload` - The raw request body, exactly as received
/// * `signature_header` - The value of the [`SIGNATURE_HEADER`] header
/// * `secret` - The API secret key
/// * `tolerance_minutes` - Maximum age of the signature; `<= 0` disables the check
pub fn verify(payload: &str, signature_header: &str, secret: &str, tolerance_minutes: i64) -> Result<WebhookEvent, VerifyError> {
    verify_at(payload, signature_header, secret, tolerance_minutes, Utc::now().timestamp())
}

/// Like [`verify`], with an explicit current time in Unix seconds.
pub fn verify_at(
    payload: &str,
    signature_header: &str,
    secret: &str,
    tolerance_minutes: i64,
    now: i64,
) -> Result<WebhookEvent, VerifyError> {
    let header = SignatureHeader::parse(signature_header).inspect_err(|_| {
        tracing::warn!("Rejected webhook: invalid signature header");
    })?;

    // Future timestamps are accepted to tolerate clock skew on our side.
    if tolerance_minutes > 0 && now.saturating_sub(header.timestamp) > tolerance_minutes.saturating_mul(60) {
        tracing::warn!(
            timestamp = header.timestamp,
            now,
            tolerance_minutes,
            "Rejected webhook: timestamp outside tolerance"
        );
        return Err(VerifyError::TimestampOutOfTolerance);
    }

    let expected = compute_signature(secret, header.timestamp, payload);
    if !signing::matches_any(&expected, &header.signatures) {
        tracing::warn!(
            timestamp = header.timestamp,
            candidates = header.signatures.len(),
            "Rejected webhook: signature mismatch"
        );
        return Err(VerifyError::SignatureMismatch);
    }

    let event: WebhookEvent = serde_json::from_str(payload)?;
    tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Verified webhook event");
    Ok(event)
}

/// Webhook verifier bound to an API secret key.
#[derive(Clone)]
pub struct Webhook {
    api_secret_key: String,
}

impl Webhook {
    pub fn new(api_secret_key: impl Into<String>) -> Self {
        Self {
            api_secret_key: api_secret_key.into(),
        }
    }

    /// Verify a delivery and return its event.
    ///
    /// `tolerance` is in minutes; `None` uses [`DEFAULT_TOLERANCE_MINUTES`] and a value
    /// `<= 0` skips the freshness check.
    pub fn construct_event(&self, payload: &str, signature_header: &str, tolerance: Option<i64>) -> Result<WebhookEvent, VerifyError> {
        verify(
            payload,
            signature_header,
            &self.api_secret_key,
            tolerance.unwrap_or(DEFAULT_TOLERANCE_MINUTES),
        )
    }

    /// Like [`Webhook::construct_event`], with an explicit current time in Unix seconds.
    pub fn construct_event_at(
        &self,
        payload: &str,
        signature_header: &str,
        tolerance: Option<i64>,
        now: i64,
    ) -> Result<WebhookEvent, VerifyError> {
        verify_at(
            payload,
            signature_header,
            &self.api_secret_key,
            tolerance.unwrap_or(DEFAULT_TOLERANCE_MINUTES),
            now,
        )
    }

    /// Build a signature header for `payload` using this secret.
    pub fn sign(&self, payload: &str, timestamp: i64) -> SignatureHeader {
        SignatureHeader::new(timestamp, compute_signature(&self.api_secret_key, timestamp, payload))
    }
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook").field("api_secret_key", &"<redacted>").finish()
    }
}
