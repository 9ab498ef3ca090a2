//! Client configuration.
//!
//! A [`ClientConfig`] can be built in code or loaded from an optional YAML file overlaid
//! with environment variables:
//!
//! ```yaml
//! api_secret_key: sk_live_...
//! api_url: https://au.api.authsignal.com/v1
//! retries: 3
//! timeout: 10s
//! backoff:
//!   base_delay: 200ms
//!   max_delay: 5s
//! ```
//!
//! Environment variables use the `AUTHSIGNAL_` prefix with `__` for nesting, e.g.
//! `AUTHSIGNAL_API_SECRET_KEY` or `AUTHSIGNAL_BACKOFF__JITTER=false`.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AuthsignalError, Result};
use crate::retry::{RetryPolicy, DEFAULT_RETRIES};
use crate::webhook::DEFAULT_TOLERANCE_MINUTES;

pub const DEFAULT_API_URL: &str = "https://api.authsignal.com/v1";

#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Tenant secret; used for Basic auth and webhook signatures
    pub api_secret_key: String,
    /// Base URL including the version path (e.g., "https://api.authsignal.com/v1")
    pub api_url: String,
    /// Retries after the first attempt; clamped to [`crate::retry::MAX_RETRIES_LIMIT`]
    pub retries: u32,
    /// Maximum age of a webhook signature in minutes; `<= 0` disables the check
    pub webhook_tolerance_minutes: i64,
    /// Per-attempt request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub backoff: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_secret_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            retries: DEFAULT_RETRIES,
            webhook_tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_secret_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("retries", &self.retries)
            .field("webhook_tolerance_minutes", &self.webhook_tolerance_minutes)
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Delay between retries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    /// Delay before the first retry; doubles on each subsequent one
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Add up to 20% random jitter to each delay
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl ClientConfig {
    pub fn new(api_secret_key: impl Into<String>) -> Self {
        Self {
            api_secret_key: api_secret_key.into(),
            ..Default::default()
        }
    }

    /// Load from an optional YAML file and `AUTHSIGNAL_*` environment variables, then validate.
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, figment::Error> {
        let config: Self = Self::figment(path).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        // AUTHSIGNAL_CONFIG names the file itself and is not a config key
        figment.merge(Env::prefixed("AUTHSIGNAL_").split("__").ignore(&["CONFIG"]))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_secret_key.trim().is_empty() {
            return Err(AuthsignalError::Config("api_secret_key must be set".to_string()));
        }

        let url = self.parsed_api_url()?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(AuthsignalError::Config(format!(
                "api_url must be an http(s) URL, got {}",
                self.api_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(AuthsignalError::Config("timeout must be greater than zero".to_string()));
        }

        Ok(())
    }

    pub(crate) fn parsed_api_url(&self) -> Result<Url> {
        Url::parse(&self.api_url).map_err(|e| AuthsignalError::Config(format!("api_url {} is invalid: {e}", self.api_url)))
    }
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        RetryPolicy::new(config.retries)
            .with_backoff(config.backoff.base_delay, config.backoff.max_delay)
            .with_jitter(config.backoff.jitter)
    }
}
