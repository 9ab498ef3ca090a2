//! Client for the Authsignal server API.
//!
//! This crate provides:
//! - Verification of signed webhook deliveries (`x-signature-v2` header, HMAC-SHA256,
//!   tolerance window, multiple active keys)
//! - An authenticated API client whose calls are retried only when it is safe: on
//!   connection failures, or on 5xx responses to `GET`/`HEAD`/`OPTIONS`
//! - Configuration from YAML and `AUTHSIGNAL_*` environment variables
//!
//! # Example
//! ```ignore
//! use authsignal::{Client, ClientConfig, TrackAttributes, TrackRequest};
//!
//! let client = Client::new(ClientConfig::new("api-secret-key"))?;
//!
//! let response = client
//!     .track(TrackRequest {
//!         user_id: "usr_123".to_string(),
//!         action: "signIn".to_string(),
//!         attributes: TrackAttributes::default(),
//!     })
//!     .await?;
//!
//! // In a webhook handler
//! let event = client.verify_webhook(&body, &signature_header)?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod types;
pub mod webhook;

// Re-export commonly used types
pub use client::Client;
pub use config::{BackoffConfig, ClientConfig};
pub use error::{AuthsignalError, RequestError, Result, TransportErrorKind};
pub use http::{HttpClient, HttpRequest, HttpResponse, MockHttpClient, ReqwestHttpClient};
pub use retry::{is_retryable, RetryPolicy};
pub use types::*;
pub use webhook::{SignatureHeader, VerifyError, Webhook, WebhookEvent};
