//! Parsing of the `x-signature-v2` header value.
//!
//! The header is a comma-separated list of `key=value` tokens:
//!
//! ```text
//! t=1740016316,v2=NwFcIT68pK7g+m365Jj4euXj/ke3GSnkTpMPcRVi5q4[,v2=...]
//! ```
//!
//! More than one `v2` token is sent while two API secrets are active (key rotation).
//! Unknown keys are ignored so later signature versions can share the header.

use std::fmt;

use super::VerifyError;

/// Key of the timestamp token.
pub const TIMESTAMP_KEY: &str = "t";

/// Key of the signature tokens understood by this verifier.
pub const SIGNATURE_VERSION: &str = "v2";

/// A parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp (seconds) at which the sender signed the payload
    pub timestamp: i64,
    /// Candidate `v2` signatures, in header order
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Build a header for a single signature.
    pub fn new(timestamp: i64, signature: impl Into<String>) -> Self {
        Self {
            timestamp,
            signatures: vec![signature.into()],
        }
    }

    /// Parse a raw header value.
    ///
    /// Tokens are split on the first `=` so base64 values keep any `=` they carry.
    /// If `t` appears more than once the last value wins.
    ///
    /// # Errors
    /// Returns [`VerifyError::InvalidFormat`] if no integer timestamp or no `v2`
    /// signature is present.
    pub fn parse(value: &str) -> Result<Self, VerifyError> {
        #[derive(Default)]
        struct Acc {
            timestamp: Option<i64>,
            invalid_timestamp: bool,
            signatures: Vec<String>,
        }

        let acc = value
            .split(',')
            .filter_map(|token| token.trim().split_once('='))
            .fold(Acc::default(), |mut acc, (key, value)| {
                match key {
                    TIMESTAMP_KEY => match value.parse::<i64>() {
                        Ok(ts) => {
                            acc.timestamp = Some(ts);
                            acc.invalid_timestamp = false;
                        }
                        Err(_) => acc.invalid_timestamp = true,
                    },
                    SIGNATURE_VERSION => acc.signatures.push(value.to_string()),
                    _ => {}
                }
                acc
            });

        match acc.timestamp {
            Some(timestamp) if !acc.invalid_timestamp && !acc.signatures.is_empty() => Ok(Self {
                timestamp,
                signatures: acc.signatures,
            }),
            _ => Err(VerifyError::InvalidFormat),
        }
    }
}

impl fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", TIMESTAMP_KEY, self.timestamp)?;
        for signature in &self.signatures {
            write!(f, ",{}={}", SIGNATURE_VERSION, signature)?;
        }
        Ok(())
    }
}
