//! Retry policy for outbound API calls.
//!
//! A failed attempt is retried when it is safe and likely to help:
//!
//! - no response was received at all (reset, broken pipe, refused, timed out): always
//! - a 5xx response: only for `GET`, `HEAD` and `OPTIONS`, since a mutation may have been
//!   partially applied before the server failed
//! - anything else (4xx, 5xx on `POST`/`PATCH`/`PUT`/`DELETE`): never
//!
//! Delays grow exponentially with the attempt number and are capped. Retries are attempts
//! of the same logical request; once the budget is spent the last error is returned as-is.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::Method;

use crate::error::RequestError;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Upper bound on configurable retries.
pub const MAX_RETRIES_LIMIT: u32 = 5;

const SAFE_HTTP_METHODS: [Method; 3] = [Method::GET, Method::HEAD, Method::OPTIONS];

/// Whether a failed attempt may be sent again.
pub fn is_retryable(error: &RequestError) -> bool {
    match error {
        RequestError::Transport { .. } => true,
        RequestError::Status { method, status, .. } => (500..=599).contains(status) && SAFE_HTTP_METHODS.contains(method),
    }
}

/// Bounded exponential backoff around [`is_retryable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    backoff_factor: u32,
    max_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRIES,
            base_delay: Duration::from_millis(100),
            backoff_factor: 2,
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default backoff. `max_retries` is clamped to
    /// [`MAX_RETRIES_LIMIT`].
    pub fn new(max_retries: u32) -> Self {
        Self::default().with_max_retries(max_retries)
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        if max_retries > MAX_RETRIES_LIMIT {
            tracing::warn!(requested = max_retries, limit = MAX_RETRIES_LIMIT, "Clamping retry count");
        }
        self.max_retries = max_retries.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether `error`, observed on attempt number `retry_attempt` (0 for the first
    /// attempt), should be followed by another attempt.
    pub fn should_retry(&self, error: &RequestError, retry_attempt: u32) -> bool {
        retry_attempt < self.max_retries && is_retryable(error)
    }

    /// Delay before retry number `retry_attempt + 1`.
    ///
    /// `base_delay * backoff_factor ^ retry_attempt`, capped at `max_delay`, plus up to 20%
    /// random jitter when enabled.
    pub fn delay(&self, retry_attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exponential = base_ms
            .saturating_mul((self.backoff_factor as u64).saturating_pow(retry_attempt))
            .min(max_ms);

        let jitter = if self.jitter && exponential > 0 {
            rand::rng().random_range(0..=exponential / 5)
        } else {
            0
        };

        Duration::from_millis(exponential + jitter)
    }

    /// Run `attempt` until it succeeds, fails terminally, or retries are exhausted.
    ///
    /// The closure is called once per attempt. Dropping the returned future while it
    /// waits on a backoff cancels the call without further attempts.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut retry_attempt = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, retry_attempt) => {
                    let delay = self.delay(retry_attempt);
                    tracing::info!(
                        method = %error.method(),
                        status = ?error.status(),
                        retry_attempt = retry_attempt + 1,
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying request with exponential backoff"
                    );
                    tokio::time::sleep(delay).await;
                    retry_attempt += 1;
                }
                Err(error) => {
                    tracing::debug!(
                        method = %error.method(),
                        status = ?error.status(),
                        retry_attempt,
                        "Request failed, not retrying"
                    );
                    return Err(error);
                }
            }
        }
    }
}
