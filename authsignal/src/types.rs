//! Request and response payloads for the Authsignal API.
//!
//! Fields use the API's camelCase names on the wire. Path parameters (user ID, action code,
//! idempotency key) live on the `*Request` wrappers, which are not serialized; only their
//! `attributes` become the request body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form attributes attached to users and actions.
pub type CustomData = Map<String, Value>;

/// Outcome of a tracked action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserActionState {
    Allow,
    Block,
    ChallengeRequired,
    ChallengeSucceeded,
    ChallengeFailed,
    ReviewRequired,
    ReviewSucceeded,
    ReviewFailed,
    /// A state introduced after this client was built
    #[serde(other)]
    Unknown,
}

/// How a user proves their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    Sms,
    EmailOtp,
    EmailMagicLink,
    AuthenticatorApp,
    Passkey,
    SecurityKey,
    Push,
    Veriff,
    Iproov,
    Idverse,
    PalmBiometricsRr,
    RecoveryCode,
    Device,
    Whatsapp,
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(default)]
    pub is_enrolled: bool,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_verified: bool,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub custom: Option<CustomData>,
    pub enrolled_verification_methods: Option<Vec<VerificationMethod>>,
    pub allowed_verification_methods: Option<Vec<VerificationMethod>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateUserRequest {
    pub user_id: String,
    pub attributes: UserAttributes,
}

/// Body returned by delete operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
}

// ============================================================================
// Authenticators
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthenticator {
    pub user_id: String,
    pub user_authenticator_id: String,
    pub verification_method: VerificationMethod,
    pub created_at: String,
    pub verified_at: Option<String>,
    pub last_verified_at: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    /// Passkey details, passed through untouched
    pub webauthn_credential: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollVerifiedAuthenticatorAttributes {
    pub verification_method: VerificationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollVerifiedAuthenticatorRequest {
    pub user_id: String,
    pub attributes: EnrollVerifiedAuthenticatorAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollVerifiedAuthenticatorResponse {
    pub authenticator: UserAuthenticator,
    pub recovery_codes: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAuthenticatorRequest {
    pub user_id: String,
    pub user_authenticator_id: String,
}

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to_settings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    pub user_id: String,
    pub action: String,
    pub attributes: TrackAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub idempotency_key: String,
    pub state: UserActionState,
    pub url: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub is_enrolled: bool,
    pub enrolled_verification_methods: Option<Vec<VerificationMethod>>,
    pub allowed_verification_methods: Option<Vec<VerificationMethod>>,
    pub default_verification_method: Option<VerificationMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub user_id: String,
    pub action: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub rule_id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub state: UserActionState,
    pub state_updated_at: Option<String>,
    pub created_at: Option<String>,
    pub verification_method: Option<VerificationMethod>,
    pub rules: Option<Vec<Rule>>,
    pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAttributes {
    pub state: UserActionState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateActionRequest {
    pub user_id: String,
    pub action: String,
    pub idempotency_key: String,
    pub attributes: ActionAttributes,
}

// ============================================================================
// Challenges
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateChallengeRequest {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateChallengeResponse {
    pub is_valid: bool,
    pub state: Option<UserActionState>,
    pub state_updated_at: Option<String>,
    pub user_id: Option<String>,
    /// Older API versions name this field `actionCode`
    #[serde(alias = "actionCode")]
    pub action: Option<String>,
    pub idempotency_key: Option<String>,
    pub verification_method: Option<VerificationMethod>,
    pub error: Option<String>,
}
