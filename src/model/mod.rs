use uuid::Uuid;

/// Transient projection of a chat participant, produced fresh per payload.
/// Never persisted directly — used to resolve or create a durable
/// [`crate::store::Contact`] through the identity resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalContact {
    /// Binding source-id candidate (`wa_id`): the extracted number for direct
    /// chats, the full identifier for groups.
    pub source_id: String,
    /// Canonical chat address with device suffix and routing annotation removed.
    pub identifier: String,
    pub name: String,
    pub phone_number: Option<String>,
}

impl CanonicalContact {
    pub fn is_group(&self) -> bool {
        self.identifier.contains(crate::ingest::classify::GROUP_SUFFIX)
    }
}

/// Media reference carried by image/video/audio/document/sticker messages.
/// `id` is either the gateway's stored media path or a legacy direct URL.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttachment {
    pub id: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub url: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.name.is_none()
            && self.address.is_none()
            && self.url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactCard {
    pub vcard: Option<String>,
    pub formatted_name: Option<String>,
}

/// Tagged content union. The normalizer produces the tag explicitly; nothing
/// downstream re-infers the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text {
        body: String,
        /// Interactive-reply fallbacks, consulted by the materializer only
        /// when `body` is blank: button text, button-reply title, list-reply
        /// title, in that order.
        button_text: Option<String>,
        button_reply_title: Option<String>,
        list_reply_title: Option<String>,
    },
    Image(MediaAttachment),
    Video(MediaAttachment),
    Audio(MediaAttachment),
    Document(MediaAttachment),
    Sticker(MediaAttachment),
    Location(Location),
    Contacts(Vec<ContactCard>),
    /// A reaction renders as a quoted reply: `body` is the reacted-to
    /// message's text, and the canonical `reply_to` holds the target id.
    Reaction { body: String },
}

impl MessageContent {
    pub fn text(body: impl Into<String>) -> Self {
        MessageContent::Text {
            body: body.into(),
            button_text: None,
            button_reply_title: None,
            list_reply_title: None,
        }
    }

    pub fn attachment(&self) -> Option<&MediaAttachment> {
        match self {
            MessageContent::Image(m)
            | MessageContent::Video(m)
            | MessageContent::Audio(m)
            | MessageContent::Document(m)
            | MessageContent::Sticker(m) => Some(m),
            _ => None,
        }
    }
}

/// One normalized message record. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMessage {
    /// Gateway message id, kept for receipt correlation and dedup.
    pub external_id: Option<String>,
    /// Raw sender reference from the payload (`sender_id`), informational.
    pub sender_ref: Option<String>,
    /// Raw recipient reference from the payload (`chat_id`), informational.
    pub recipient_ref: Option<String>,
    pub timestamp: i64,
    pub content: MessageContent,
    /// External id of the message this one replies to (or reacts to).
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

/// Receipt fan-out record: one per id in the payload's `ids` array.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub external_id: String,
    pub status: DeliveryStatus,
    pub timestamp: i64,
}

/// Result of normalizing one raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Nothing to do: unknown event, group housekeeping, or no usable content.
    Empty,
    Messages {
        from: CanonicalContact,
        to: CanonicalContact,
        messages: Vec<CanonicalMessage>,
    },
    Statuses(Vec<StatusUpdate>),
}

/// Final outcome of processing one webhook delivery. The pipeline never
/// surfaces an error for third-party input — a malformed payload is a
/// `Skipped`, not a crash.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Skipped,
    Created {
        conversation_id: Uuid,
        message_ids: Vec<Uuid>,
    },
    StatusesApplied {
        applied: usize,
        total: usize,
    },
}
