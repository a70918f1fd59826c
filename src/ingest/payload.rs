//! Wire schema for gateway webhook deliveries.
//!
//! Three overlapping shapes arrive on the same endpoint: legacy flat fields
//! (`text`, `image_url`, `latitude`…), nested `message` objects, and nested
//! receipt envelopes that repeat `event: message.ack` one level down. Every
//! field is optional; precedence between alternatives is encoded where the
//! values are consumed (`normalize`), not by the schema.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    pub event: Option<String>,
    /// Inbound deliveries may be wrapped in an outer envelope repeating the
    /// interesting fields under `payload` — possibly twice for receipts.
    pub payload: Option<Box<RawPayload>>,

    pub from: Option<String>,
    pub pushname: Option<String>,
    pub sender_id: Option<String>,
    pub chat_id: Option<String>,
    /// Unix seconds as a number, or an RFC 3339 string, depending on the
    /// gateway build.
    pub timestamp: Option<Value>,

    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Nested message object in current builds; a bare string in legacy ones.
    pub message: Option<RawMessageField>,
    pub text: Option<String>,
    pub content: Option<String>,

    pub reaction: Option<RawReaction>,

    pub image: Option<RawMedia>,
    pub video: Option<RawMedia>,
    pub audio: Option<RawMedia>,
    pub document: Option<RawMedia>,
    pub sticker: Option<RawMedia>,

    // Legacy flat media fields
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
    pub document_url: Option<String>,
    pub sticker_url: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,

    pub location: Option<RawLocation>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_url: Option<String>,

    pub contact: Option<RawContactCard>,
    pub contact_vcard: Option<String>,
    /// Pre-shaped contact-card array, passed through as-is by some builds.
    pub contacts: Option<Value>,

    pub button: Option<RawButton>,
    pub interactive: Option<RawInteractive>,

    pub quoted_message_id: Option<Value>,
    pub in_reply_to: Option<Value>,

    // Receipt fields
    pub ids: Option<Vec<String>>,
    pub receipt_type: Option<String>,
}

impl RawPayload {
    /// The effective payload: the inner envelope when present, the outer
    /// object otherwise.
    pub fn inner(&self) -> &RawPayload {
        self.payload.as_deref().unwrap_or(self)
    }

    /// First present `event` label, inner envelope preferred.
    pub fn event_label(&self) -> Option<&str> {
        self.inner().event.as_deref().or(self.event.as_deref())
    }

    pub fn message_object(&self) -> Option<&RawMessage> {
        match &self.message {
            Some(RawMessageField::Object(m)) => Some(m),
            _ => None,
        }
    }

    pub fn message_text(&self) -> Option<&str> {
        match &self.message {
            Some(RawMessageField::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn has_message(&self) -> bool {
        match &self.message {
            Some(RawMessageField::Object(m)) => !m.is_empty(),
            Some(RawMessageField::Text(s)) => !s.trim().is_empty(),
            None => false,
        }
    }
}

/// `message` is an object in current gateway builds and a plain string in
/// legacy ones; both carry the body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMessageField {
    Object(RawMessage),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    pub id: Option<String>,
    pub text: Option<String>,
    pub replied_id: Option<Value>,
}

impl RawMessage {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.text.is_none() && self.replied_id.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReaction {
    /// Text of the message the reaction points at.
    pub message: Option<String>,
    /// External id of the reacted-to message.
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    pub id: Option<String>,
    pub media_path: Option<String>,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    #[serde(rename = "degreesLatitude")]
    pub degrees_latitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(rename = "degreesLongitude")]
    pub degrees_longitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawContactCard {
    pub vcard: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawButton {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInteractive {
    pub button_reply: Option<RawReplyTitle>,
    pub list_reply: Option<RawReplyTitle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReplyTitle {
    pub title: Option<String>,
}

/// External ids arrive as strings or numbers; either way they correlate as
/// strings downstream.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Unix-seconds timestamp from either wire representation. Unparseable or
/// absent values fall back to the current time, matching receipt ordering
/// semantics (a late fallback is still monotone enough for status display).
pub fn unix_timestamp(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map_or_else(|_| Utc::now().timestamp(), |dt| dt.timestamp()),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_else(|| Utc::now().timestamp()),
        _ => Utc::now().timestamp(),
    }
}
