//! Event classification.
//!
//! The gateway usually labels deliveries with an `event` field, but some
//! deployments omit it on plain messages. An explicit field always wins;
//! otherwise the kind is inferred from the `from` identifier's domain suffix.

use crate::ingest::identifier;
use crate::ingest::payload::RawPayload;

// Domain suffixes are matched as substrings rather than parsed into an
// enumeration — gateways vary in the exact identifier grammar around them.
pub const DIRECT_SUFFIX: &str = "@s.whatsapp.net";
pub const GROUP_SUFFIX: &str = "@g.us";
pub const NEWSLETTER_SUFFIX: &str = "@newsletter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    GroupMessage,
    /// Delivery receipt (`message.ack`): sent / delivered / read.
    Ack,
    /// Group membership housekeeping. Carries no chat content; skipped so it
    /// can never create an empty conversation.
    GroupParticipants,
    /// Broadcast/newsletter chats are recognized but not handled.
    Newsletter,
    Unknown,
}

impl EventKind {
    fn from_label(label: &str) -> Self {
        match label {
            "message" => EventKind::Message,
            "group.message" => EventKind::GroupMessage,
            "message.ack" => EventKind::Ack,
            "group.participants" => EventKind::GroupParticipants,
            "newsletter" => EventKind::Newsletter,
            _ => EventKind::Unknown,
        }
    }
}

/// Classify one unwrapped payload. `explicit` is the first present `event`
/// field (inner envelope preferred over outer).
pub fn classify(explicit: Option<&str>, payload: &RawPayload) -> EventKind {
    if let Some(label) = explicit {
        if !label.trim().is_empty() {
            return EventKind::from_label(label);
        }
    }
    infer_from_sender(payload)
}

/// Suffix inference for payloads without an `event` field. Absent or blank
/// `from` defaults to a direct message — the normalizer's content guards
/// decide whether anything comes of it.
fn infer_from_sender(payload: &RawPayload) -> EventKind {
    let Some(from) = payload.from.as_deref() else {
        return EventKind::Message;
    };
    let identifier = identifier::to_side(from);
    if identifier.is_empty() {
        return EventKind::Message;
    }
    if identifier.contains(DIRECT_SUFFIX) {
        return EventKind::Message;
    }
    if identifier.contains(GROUP_SUFFIX) {
        return EventKind::GroupMessage;
    }
    if identifier.contains(NEWSLETTER_SUFFIX) {
        return EventKind::Newsletter;
    }
    EventKind::Message
}
