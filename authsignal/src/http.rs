//! HTTP client abstraction for making requests.
//!
//! This module defines the `HttpClient` trait to abstract HTTP request execution,
//! enabling testability with mock implementations.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::{RequestError, TransportErrorKind};

/// An outbound request, fully prepared by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, including any query string
    pub url: String,
    /// Username for HTTP Basic auth; the password is always empty
    pub basic_auth_user: Option<String>,
    pub headers: Vec<(String, String)>,
    /// JSON body, if any
    pub body: Option<String>,
}

/// Response from an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for executing HTTP requests.
///
/// Implementations return `Ok` for every response that was received, whatever its status,
/// and [`RequestError::Transport`] only when no response arrived.
#[async_trait]
pub trait HttpClient: Send + Sync + Clone {
    /// Execute a single attempt of an HTTP request.
    async fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, RequestError>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new reqwest-based HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, RequestError> {
        tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Executing HTTP request");

        let mut req = self.client.request(request.method.clone(), &request.url).timeout(timeout);

        if let Some(user) = &request.basic_auth_user {
            req = req.basic_auth(user, Some(""));
        }

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            req = req.header("Content-Type", "application/json").body(body.clone());
        }

        let response = req.send().await.map_err(|e| {
            tracing::warn!(error = %e, "HTTP request failed");
            transport_error(&request.method, &e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(&request.method, &e))?;

        tracing::debug!(status, response_len = body.len(), "HTTP request completed");

        Ok(HttpResponse { status, body })
    }
}

fn transport_error(method: &Method, err: &reqwest::Error) -> RequestError {
    RequestError::Transport {
        method: method.clone(),
        kind: classify(err),
        message: err.to_string(),
    }
}

/// Map a reqwest failure onto the connection-level cases the retry policy knows about.
fn classify(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::TimedOut;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => TransportErrorKind::ConnectionReset,
                std::io::ErrorKind::BrokenPipe => TransportErrorKind::BrokenPipe,
                std::io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
                std::io::ErrorKind::TimedOut => TransportErrorKind::TimedOut,
                _ => TransportErrorKind::Other,
            };
        }
        source = cause.source();
    }

    if err.is_connect() {
        TransportErrorKind::ConnectionRefused
    } else {
        TransportErrorKind::Other
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Mock HTTP client for testing.
///
/// Allows configuring predetermined responses for specific requests without
/// making actual HTTP calls.
///
/// # Example
/// ```ignore
/// let mock = MockHttpClient::new();
/// mock.add_response("GET /v1/users/123", Ok(HttpResponse { status: 200, body: "{}".to_string() }));
/// ```
#[derive(Clone)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Vec<Result<HttpResponse, RequestError>>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

/// Record of a call made to the mock HTTP client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub method: Method,
    pub url: String,
    pub path: String,
    pub body: Option<String>,
    pub basic_auth_user: Option<String>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a predetermined response for a specific method and path.
    ///
    /// The key is formatted as "{method} {path}". Multiple responses can be
    /// added for the same key - they will be returned in FIFO order.
    pub fn add_response(&self, key: &str, response: Result<HttpResponse, RequestError>) {
        self.responses.lock().entry(key.to_string()).or_default().push(response);
    }

    /// Get all calls that have been made to this mock client.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, RequestError> {
        let path = url::Url::parse(&request.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| request.url.clone());

        self.calls.lock().push(MockCall {
            method: request.method.clone(),
            url: request.url.clone(),
            path: path.clone(),
            body: request.body.clone(),
            basic_auth_user: request.basic_auth_user.clone(),
            headers: request.headers.clone(),
            timeout,
        });

        let key = format!("{} {}", request.method, path);
        let mut responses = self.responses.lock();

        if let Some(response_queue) = responses.get_mut(&key) {
            if !response_queue.is_empty() {
                return response_queue.remove(0);
            }
        }

        // No response configured: fail as if nothing answered
        Err(RequestError::Transport {
            method: request.method.clone(),
            kind: TransportErrorKind::Other,
            message: format!("No mock response configured for {key}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, url: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: url.to_string(),
            basic_auth_user: Some("secret".to_string()),
            headers: vec![],
            body: None,
        }
    }

    #[tokio::test]
    async fn test_mock_client_basic() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "GET /v1/users/123",
            Ok(HttpResponse {
                status: 200,
                body: "success".to_string(),
            }),
        );

        let response = mock
            .execute(&request(Method::GET, "https://api.example.com/v1/users/123?x=1"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "success");

        let calls = mock.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::GET);
        assert_eq!(calls[0].path, "/v1/users/123");
        assert_eq!(calls[0].basic_auth_user.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_mock_client_multiple_responses() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "GET /status",
            Ok(HttpResponse {
                status: 503,
                body: "first".to_string(),
            }),
        );
        mock.add_response(
            "GET /status",
            Ok(HttpResponse {
                status: 200,
                body: "second".to_string(),
            }),
        );

        let req = request(Method::GET, "https://api.example.com/status");

        let response1 = mock.execute(&req, Duration::from_secs(5)).await.unwrap();
        assert_eq!(response1.body, "first");
        assert!(!response1.is_success());

        let response2 = mock.execute(&req, Duration::from_secs(5)).await.unwrap();
        assert_eq!(response2.body, "second");
        assert!(response2.is_success());

        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_client_no_response() {
        let mock = MockHttpClient::new();

        let result = mock
            .execute(&request(Method::POST, "https://api.example.com/unknown"), Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(RequestError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_reqwest_client_connection_refused() {
        // Bind then drop a listener so the port is known to be closed
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = ReqwestHttpClient::from_client(reqwest::Client::builder().no_proxy().build().unwrap());
        let err = client
            .execute(&request(Method::GET, &format!("http://127.0.0.1:{port}/v1/users/1")), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            RequestError::Transport { method, kind, .. } => {
                assert_eq!(method, Method::GET);
                assert_eq!(kind, TransportErrorKind::ConnectionRefused);
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
