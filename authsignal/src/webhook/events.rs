//! Webhook event payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An event delivered by an Authsignal webhook.
///
/// `data` is left as raw JSON; its shape depends on `event_type`. Use [`WebhookEvent::data_as`]
/// to decode it into a concrete type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Payload schema version
    pub version: i64,
    /// Event type (e.g., "email.created")
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unique event ID
    pub id: String,
    /// Origin of the event (e.g., "https://authsignal.com")
    pub source: String,
    /// When the event occurred (RFC 3339)
    pub time: String,
    /// Tenant that emitted the event
    pub tenant_id: String,
    /// Event-specific data
    pub data: serde_json::Value,
}

impl WebhookEvent {
    /// Decode `data` into a caller-supplied type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
