//! Authenticated client for the Authsignal server API.
//!
//! Every operation goes through one private `execute` path, which adds Basic auth and version
//! headers, runs the attempt loop of the configured [`RetryPolicy`], and maps failures to
//! [`AuthsignalError`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{AuthsignalError, RequestError, Result};
use crate::http::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::retry::RetryPolicy;
use crate::types::*;
use crate::webhook::{Webhook, WebhookEvent};

const USER_AGENT: &str = "authsignal-rust";
const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Authsignal API client.
///
/// Cheap to clone; clones share the underlying HTTP client.
///
/// # Example
/// ```ignore
/// use authsignal::{Client, ClientConfig, UserRequest};
///
/// let client = Client::new(ClientConfig::new("api-secret-key"))?;
/// let user = client.get_user(UserRequest { user_id: "usr_123".into() }).await?;
/// ```
#[derive(Clone)]
pub struct Client<H: HttpClient = ReqwestHttpClient> {
    api_secret_key: String,
    api_url: Url,
    timeout: Duration,
    retry_policy: RetryPolicy,
    webhook: Webhook,
    webhook_tolerance_minutes: i64,
    http_client: Arc<H>,
}

impl Client<ReqwestHttpClient> {
    /// Create a client backed by reqwest.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }
}

impl<H: HttpClient> Client<H> {
    /// Create a client that sends requests through `http_client`.
    pub fn with_http_client(config: ClientConfig, http_client: Arc<H>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            api_url: config.parsed_api_url()?,
            timeout: config.timeout,
            retry_policy: RetryPolicy::from(&config),
            webhook: Webhook::new(config.api_secret_key.clone()),
            webhook_tolerance_minutes: config.webhook_tolerance_minutes,
            api_secret_key: config.api_secret_key,
            http_client,
        })
    }

    /// Replace the retry policy derived from the config.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Webhook verifier using this client's secret.
    pub fn webhook(&self) -> &Webhook {
        &self.webhook
    }

    /// Verify a webhook delivery using the configured tolerance.
    pub fn verify_webhook(&self, payload: &str, signature_header: &str) -> Result<WebhookEvent> {
        Ok(self
            .webhook
            .construct_event(payload, signature_header, Some(self.webhook_tolerance_minutes))?)
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn get_user(&self, request: UserRequest) -> Result<UserResponse> {
        self.execute(Method::GET, &["users", &request.user_id], None).await
    }

    pub async fn update_user(&self, request: UpdateUserRequest) -> Result<UserAttributes> {
        let body = serde_json::to_string(&request.attributes)?;
        self.execute(Method::POST, &["users", &request.user_id], Some(body)).await
    }

    pub async fn delete_user(&self, request: UserRequest) -> Result<DeleteResponse> {
        self.execute(Method::DELETE, &["users", &request.user_id], None).await
    }

    // ========================================================================
    // Authenticators
    // ========================================================================

    pub async fn get_authenticators(&self, request: UserRequest) -> Result<Vec<UserAuthenticator>> {
        self.execute(Method::GET, &["users", &request.user_id, "authenticators"], None)
            .await
    }

    pub async fn enroll_verified_authenticator(
        &self,
        request: EnrollVerifiedAuthenticatorRequest,
    ) -> Result<EnrollVerifiedAuthenticatorResponse> {
        let body = serde_json::to_string(&request.attributes)?;
        self.execute(Method::POST, &["users", &request.user_id, "authenticators"], Some(body))
            .await
    }

    pub async fn delete_authenticator(&self, request: DeleteAuthenticatorRequest) -> Result<DeleteResponse> {
        self.execute(
            Method::DELETE,
            &["users", &request.user_id, "authenticators", &request.user_authenticator_id],
            None,
        )
        .await
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Record an action and get the rule engine's decision.
    pub async fn track(&self, request: TrackRequest) -> Result<TrackResponse> {
        let body = serde_json::to_string(&request.attributes)?;
        self.execute(Method::POST, &["users", &request.user_id, "actions", &request.action], Some(body))
            .await
    }

    /// Look up a tracked action. Returns `None` when it does not exist.
    pub async fn get_action(&self, request: ActionRequest) -> Result<Option<ActionResponse>> {
        let result = self
            .execute(
                Method::GET,
                &["users", &request.user_id, "actions", &request.action, &request.idempotency_key],
                None,
            )
            .await;

        match result {
            Ok(action) => Ok(Some(action)),
            Err(err) if err.status_code() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn update_action(&self, request: UpdateActionRequest) -> Result<ActionAttributes> {
        let body = serde_json::to_string(&request.attributes)?;
        self.execute(
            Method::PATCH,
            &["users", &request.user_id, "actions", &request.action, &request.idempotency_key],
            Some(body),
        )
        .await
    }

    // ========================================================================
    // Challenges
    // ========================================================================

    /// Check a token returned by a pre-built UI or client SDK challenge.
    pub async fn validate_challenge(&self, request: ValidateChallengeRequest) -> Result<ValidateChallengeResponse> {
        let body = serde_json::to_string(&request)?;
        self.execute(Method::POST, &["validate"], Some(body)).await
    }

    /// Send one logical request, retrying per the policy, and decode a success body.
    #[tracing::instrument(skip(self, segments, body), fields(path = %segments.join("/")))]
    async fn execute<T: DeserializeOwned>(&self, method: Method, segments: &[&str], body: Option<String>) -> Result<T> {
        let request = HttpRequest {
            url: self.endpoint(segments)?.to_string(),
            method,
            basic_auth_user: Some(self.api_secret_key.clone()),
            headers: vec![
                ("User-Agent".to_string(), USER_AGENT.to_string()),
                ("X-Authsignal-Version".to_string(), API_VERSION.to_string()),
            ],
            body,
        };

        let http_client = &self.http_client;
        let request = &request;
        let timeout = self.timeout;

        let response = self
            .retry_policy
            .run(|| async move {
                let response = http_client.execute(request, timeout).await?;
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(RequestError::Status {
                        method: request.method.clone(),
                        status: response.status,
                        body: response.body,
                    })
                }
            })
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Request failed");
                AuthsignalError::from(e)
            })?;

        decode(&response.body)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthsignalError::Config(format!("api_url {} cannot be a base URL", self.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl<H: HttpClient> std::fmt::Debug for Client<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url.as_str())
            .field("timeout", &self.timeout)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use crate::http::{HttpResponse, MockHttpClient};

    const API_URL: &str = "https://api.authsignal.test/v1";

    fn ok(body: &str) -> std::result::Result<HttpResponse, RequestError> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status(status: u16, body: &str) -> std::result::Result<HttpResponse, RequestError> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
        })
    }

    fn client(mock: &MockHttpClient) -> Client<MockHttpClient> {
        let mut config = ClientConfig::new("test-secret");
        config.api_url = API_URL.to_string();
        config.backoff.jitter = false;
        Client::with_http_client(config, Arc::new(mock.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_get_user_sends_auth_and_headers() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "GET /v1/users/usr_123",
            ok(r#"{"isEnrolled":true,"email":"jane@example.com","enrolledVerificationMethods":["SMS","PASSKEY"]}"#),
        );

        let user = client(&mock)
            .get_user(UserRequest {
                user_id: "usr_123".to_string(),
            })
            .await
            .unwrap();

        assert!(user.is_enrolled);
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        assert_eq!(
            user.enrolled_verification_methods,
            Some(vec![VerificationMethod::Sms, VerificationMethod::Passkey])
        );

        let calls = mock.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, "https://api.authsignal.test/v1/users/usr_123");
        assert_eq!(calls[0].basic_auth_user.as_deref(), Some("test-secret"));
        assert_eq!(calls[0].timeout, Duration::from_secs(30));
        assert!(calls[0]
            .headers
            .iter()
            .any(|(name, value)| name == "User-Agent" && value == "authsignal-rust"));
        assert!(calls[0].headers.iter().any(|(name, _)| name == "X-Authsignal-Version"));
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let mock = MockHttpClient::new();
        mock.add_response("POST /v1/users/a%2Fb%20c/actions/sign%20in", ok(r#"{"idempotencyKey":"k","state":"ALLOW"}"#));

        let response = client(&mock)
            .track(TrackRequest {
                user_id: "a/b c".to_string(),
                action: "sign in".to_string(),
                attributes: TrackAttributes::default(),
            })
            .await
            .unwrap();

        assert_eq!(response.state, UserActionState::Allow);
        assert_eq!(mock.get_calls()[0].body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_api_url_trailing_slash() {
        let mock = MockHttpClient::new();
        mock.add_response("POST /v1/validate", ok(r#"{"isValid":false}"#));

        let mut config = ClientConfig::new("test-secret");
        config.api_url = format!("{API_URL}/");
        let client = Client::with_http_client(config, Arc::new(mock.clone())).unwrap();

        let response = client
            .validate_challenge(ValidateChallengeRequest {
                token: "tok".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!response.is_valid);
        assert_eq!(mock.get_calls()[0].body.as_deref(), Some(r#"{"token":"tok"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_retries_server_errors() {
        let mock = MockHttpClient::new();
        mock.add_response("GET /v1/users/usr_1", status(503, ""));
        mock.add_response("GET /v1/users/usr_1", status(502, ""));
        mock.add_response("GET /v1/users/usr_1", ok(r#"{"isEnrolled":false}"#));

        let user = client(&mock)
            .get_user(UserRequest {
                user_id: "usr_1".to_string(),
            })
            .await
            .unwrap();

        assert!(!user.is_enrolled);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_does_not_retry_server_errors() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "POST /v1/users/usr_1/actions/signIn",
            status(500, r#"{"error":"internal_error","errorDescription":"Something went wrong."}"#),
        );
        mock.add_response("POST /v1/users/usr_1/actions/signIn", ok(r#"{"idempotencyKey":"k","state":"ALLOW"}"#));

        let err = client(&mock)
            .track(TrackRequest {
                user_id: "usr_1".to_string(),
                action: "signIn".to_string(),
                attributes: TrackAttributes::default(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(500));
        assert_eq!(err.to_string(), "AuthsignalError: 500 - Something went wrong.");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_retries_transport_errors() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "POST /v1/users/usr_1",
            Err(RequestError::Transport {
                method: Method::POST,
                kind: TransportErrorKind::ConnectionReset,
                message: "connection reset by peer".to_string(),
            }),
        );
        mock.add_response("POST /v1/users/usr_1", ok(r#"{"email":"new@example.com"}"#));

        let attributes = client(&mock)
            .update_user(UpdateUserRequest {
                user_id: "usr_1".to_string(),
                attributes: UserAttributes {
                    email: Some("new@example.com".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(attributes.email.as_deref(), Some("new@example.com"));
        assert_eq!(mock.call_count(), 2);
        let calls = mock.get_calls();
        assert_eq!(calls[0].body, calls[1].body);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_after_exhausting_retries() {
        let mock = MockHttpClient::new();

        let err = client(&mock)
            .delete_user(UserRequest {
                user_id: "usr_1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthsignalError::Transport { .. }));
        // First attempt plus the two default retries
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_get_action_not_found_is_none() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "GET /v1/users/usr_1/actions/signIn/missing",
            status(404, r#"{"error":"not_found","errorDescription":"Action not found."}"#),
        );

        let action = client(&mock)
            .get_action(ActionRequest {
                user_id: "usr_1".to_string(),
                action: "signIn".to_string(),
                idempotency_key: "missing".to_string(),
            })
            .await
            .unwrap();

        assert!(action.is_none());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_update_action_uses_patch() {
        let mock = MockHttpClient::new();
        mock.add_response("PATCH /v1/users/usr_1/actions/signIn/key-1", ok(r#"{"state":"REVIEW_SUCCEEDED"}"#));

        let attributes = client(&mock)
            .update_action(UpdateActionRequest {
                user_id: "usr_1".to_string(),
                action: "signIn".to_string(),
                idempotency_key: "key-1".to_string(),
                attributes: ActionAttributes {
                    state: UserActionState::ReviewSucceeded,
                },
            })
            .await
            .unwrap();

        assert_eq!(attributes.state, UserActionState::ReviewSucceeded);
        assert_eq!(
            mock.get_calls()[0].body.as_deref(),
            Some(r#"{"state":"REVIEW_SUCCEEDED"}"#)
        );
    }

    #[tokio::test]
    async fn test_get_authenticators() {
        let mock = MockHttpClient::new();
        mock.add_response(
            "GET /v1/users/usr_1/authenticators",
            ok(r#"[{"userId":"usr_1","userAuthenticatorId":"auth_1","verificationMethod":"SMS","createdAt":"2025-01-01T00:00:00Z","phoneNumber":"+64271234567"}]"#),
        );

        let authenticators = client(&mock)
            .get_authenticators(UserRequest {
                user_id: "usr_1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(authenticators.len(), 1);
        assert_eq!(authenticators[0].verification_method, VerificationMethod::Sms);
        assert_eq!(authenticators[0].phone_number.as_deref(), Some("+64271234567"));
    }

    #[tokio::test]
    async fn test_invalid_success_body_is_decode_error() {
        let mock = MockHttpClient::new();
        mock.add_response("DELETE /v1/users/usr_1/authenticators/auth_1", ok("not json"));

        let err = client(&mock)
            .delete_authenticator(DeleteAuthenticatorRequest {
                user_id: "usr_1".to_string(),
                user_authenticator_id: "auth_1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthsignalError::Decode(_)));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Client::new(ClientConfig::default()).unwrap_err();
        assert!(matches!(err, AuthsignalError::Config(_)));
    }

    #[test]
    fn test_verify_webhook_uses_client_secret() {
        let client = client(&MockHttpClient::new());
        let payload = r#"{"version":1,"type":"email.created","id":"x","source":"s","time":"t","tenantId":"n","data":{}}"#;
        let header = client.webhook().sign(payload, chrono::Utc::now().timestamp()).to_string();

        let event = client.verify_webhook(payload, &header).unwrap();
        assert_eq!(event.id, "x");

        let err = client.verify_webhook(payload, "t=1,v2=bogus").unwrap_err();
        assert_eq!(err.to_string(), "Timestamp is outside the tolerance zone.");
    }
}
