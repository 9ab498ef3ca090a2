use reqwest::Method;
use serde::Deserialize;
use thiserror::Error;

use crate::webhook::VerifyError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, AuthsignalError>;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum AuthsignalError {
    /// The API answered with a non-success status
    #[error("AuthsignalError: {status_code} - {}", describe(.error_code, .error_description))]
    Api {
        status_code: u16,
        error_code: String,
        error_description: Option<String>,
    },

    /// No response was received, after any retries
    #[error("AuthsignalError: {method} request failed: {message}")]
    Transport { method: Method, message: String },

    /// A success response could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Webhook delivery failed verification
    #[error(transparent)]
    Webhook(#[from] VerifyError),

    /// Client configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AuthsignalError {
    /// HTTP status of an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AuthsignalError::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Machine-readable code of an API error (e.g., "unauthorized").
    pub fn error_code(&self) -> Option<&str> {
        match self {
            AuthsignalError::Api { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

fn describe<'a>(error_code: &'a str, error_description: &'a Option<String>) -> &'a str {
    match error_description {
        Some(description) if !description.is_empty() => description,
        _ => error_code,
    }
}

/// Error body returned by the API on failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

const UNEXPECTED_ERROR: &str = "unexpected_error";

/// Classification of failures where no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    ConnectionReset,
    BrokenPipe,
    ConnectionRefused,
    TimedOut,
    Other,
}

/// Outcome of a single failed attempt of an outbound request.
///
/// Both variants carry the request method so the retry policy can tell safe reads from
/// mutations without looking at the original request.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The request failed before any response was received
    #[error("{method} request failed before a response was received ({kind:?}): {message}")]
    Transport {
        method: Method,
        kind: TransportErrorKind,
        message: String,
    },

    /// A response was received with a non-success status
    #[error("{method} request returned {status}")]
    Status { method: Method, status: u16, body: String },
}

impl RequestError {
    pub fn method(&self) -> &Method {
        match self {
            RequestError::Transport { method, .. } | RequestError::Status { method, .. } => method,
        }
    }

    /// Response status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Transport { .. } => None,
            RequestError::Status { status, .. } => Some(*status),
        }
    }
}

impl From<RequestError> for AuthsignalError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Transport { method, message, .. } => AuthsignalError::Transport { method, message },
            RequestError::Status { status, body, .. } => {
                let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
                AuthsignalError::Api {
                    status_code: status,
                    error_code: parsed.error.unwrap_or_else(|| UNEXPECTED_ERROR.to_string()),
                    error_description: parsed.error_description,
                }
            }
        }
    }
}
