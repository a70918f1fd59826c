//! Payload normalization.
//!
//! Turns one raw delivery into the canonical intermediate form: a (from, to)
//! pair of contact descriptors plus canonical message records, or a list of
//! delivery-status updates for receipts. All fallback chains between the
//! overlapping wire shapes live here, encoded as first-present-wins lookups.

use serde_json::Value;
use tracing::debug;

use crate::ingest::classify::{DIRECT_SUFFIX, EventKind, GROUP_SUFFIX};
use crate::ingest::identifier;
use crate::ingest::payload::{self, RawPayload};
use crate::model::{
    CanonicalContact, CanonicalMessage, ContactCard, DeliveryStatus, Location, MediaAttachment,
    MessageContent, Normalized, StatusUpdate,
};

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

/// Normalize one delivery envelope for the given event kind.
/// `channel_number` is the channel's own configured phone number, used to
/// synthesize the destination of plain incoming messages.
pub fn normalize(envelope: &RawPayload, kind: EventKind, channel_number: &str) -> Normalized {
    match kind {
        EventKind::Ack => normalize_receipt(envelope),
        EventKind::Message | EventKind::GroupMessage => {
            let payload = envelope.inner();
            if !payload.has_message() && blank(payload.text.as_deref()) {
                debug!("gateway webhook: skipping payload without message data");
                return Normalized::Empty;
            }
            normalize_message(payload, channel_number)
        }
        EventKind::GroupParticipants => {
            debug!("gateway webhook: skipping group housekeeping event");
            Normalized::Empty
        }
        EventKind::Newsletter | EventKind::Unknown => {
            debug!("gateway webhook: skipping unhandled event kind {:?}", kind);
            Normalized::Empty
        }
    }
}

fn normalize_message(payload: &RawPayload, channel_number: &str) -> Normalized {
    if !payload.has_message()
        && blank(payload.text.as_deref())
        && blank(payload.content.as_deref())
    {
        debug!("gateway webhook: skipping payload without message content");
        return Normalized::Empty;
    }

    let from = extract_contact_from(payload);
    let to = extract_contact_to(payload, channel_number);

    let Some(message) = extract_message(payload) else {
        debug!("gateway webhook: skipping message without usable content");
        return Normalized::Empty;
    };

    Normalized::Messages {
        from,
        to,
        messages: vec![message],
    }
}

fn extract_contact_from(payload: &RawPayload) -> CanonicalContact {
    let raw_from = payload.from.as_deref().unwrap_or("");
    let chat_address = identifier::from_side(raw_from);
    let number = identifier::extract_number(&chat_address);
    let phone = format!("+{}", number);
    let name = match payload.pushname.as_deref() {
        Some(push) if !push.trim().is_empty() => push.to_string(),
        _ => phone.clone(),
    };

    CanonicalContact {
        source_id: number,
        identifier: chat_address,
        name,
        phone_number: Some(phone),
    }
}

fn extract_contact_to(payload: &RawPayload, channel_number: &str) -> CanonicalContact {
    let raw_from = payload.from.as_deref().unwrap_or("");

    let chat_address = if identifier::is_routed(raw_from) {
        identifier::to_side(raw_from)
    } else {
        let sender_number = identifier::extract_number(raw_from);
        let own_number = identifier::extract_number(channel_number);
        if sender_number == own_number {
            // Self-addressed chat: there is no distinct destination to
            // synthesize, so the sending side's address is reused. Best-effort.
            identifier::to_side(raw_from)
        } else {
            format!("{}{}", own_number, DIRECT_SUFFIX)
        }
    };
    let phone = format!("+{}", identifier::extract_number(&chat_address));

    // Group identifiers are non-numeric as source ids, and groups have no
    // singular phone identity.
    let is_group = chat_address.contains(GROUP_SUFFIX);
    let source_id = if is_group {
        chat_address.clone()
    } else {
        identifier::extract_number(&chat_address)
    };
    let phone_number = if is_group { None } else { Some(phone.clone()) };

    CanonicalContact {
        source_id,
        identifier: chat_address,
        name: phone,
        phone_number,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Location,
    Contacts,
    Reaction,
}

impl Kind {
    fn from_label(label: &str) -> Option<Kind> {
        match label {
            "text" => Some(Kind::Text),
            "image" => Some(Kind::Image),
            "video" => Some(Kind::Video),
            "audio" => Some(Kind::Audio),
            "document" => Some(Kind::Document),
            "sticker" => Some(Kind::Sticker),
            "location" => Some(Kind::Location),
            "contacts" => Some(Kind::Contacts),
            "reaction" => Some(Kind::Reaction),
            _ => None,
        }
    }
}

/// Message-kind inference when no explicit `type` is present. A reaction
/// block outranks everything; media kinds check their structured block, the
/// legacy `_url` field and the legacy `media_type` label; location accepts a
/// raw latitude/longitude pair; default is text.
fn infer_kind(payload: &RawPayload) -> Option<Kind> {
    if let Some(label) = payload.kind.as_deref() {
        if !label.trim().is_empty() {
            return Kind::from_label(label);
        }
    }
    if payload.reaction.is_some() {
        return Some(Kind::Reaction);
    }
    if payload.image.is_some()
        || payload.image_url.is_some()
        || payload.media_type.as_deref() == Some("image")
    {
        return Some(Kind::Image);
    }
    if payload.video.is_some()
        || payload.video_url.is_some()
        || payload.media_type.as_deref() == Some("video")
    {
        return Some(Kind::Video);
    }
    if payload.audio.is_some()
        || payload.audio_url.is_some()
        || payload.media_type.as_deref() == Some("audio")
    {
        return Some(Kind::Audio);
    }
    if payload.document.is_some()
        || payload.document_url.is_some()
        || payload.media_type.as_deref() == Some("document")
    {
        return Some(Kind::Document);
    }
    if payload.sticker.is_some()
        || payload.sticker_url.is_some()
        || payload.media_type.as_deref() == Some("sticker")
    {
        return Some(Kind::Sticker);
    }
    if payload.location.is_some() || (payload.latitude.is_some() && payload.longitude.is_some()) {
        return Some(Kind::Location);
    }
    if payload.contact.is_some() || payload.contact_vcard.is_some() || payload.contacts.is_some() {
        return Some(Kind::Contacts);
    }
    Some(Kind::Text)
}

fn extract_message(payload: &RawPayload) -> Option<CanonicalMessage> {
    let kind = infer_kind(payload)?;
    let content = build_content(payload, kind)?;

    // A reaction renders as a quoted reply to its target; an explicit reply
    // context on the payload overrides it.
    let mut reply_to = match (kind, &payload.reaction) {
        (Kind::Reaction, Some(reaction)) => {
            reaction.id.as_ref().and_then(payload::id_string)
        }
        _ => None,
    };
    if let Some(id) = reply_context(payload) {
        reply_to = Some(id);
    }

    Some(CanonicalMessage {
        external_id: payload.message_object().and_then(|m| m.id.clone()),
        sender_ref: payload.sender_id.clone(),
        recipient_ref: payload.chat_id.clone(),
        timestamp: payload::unix_timestamp(payload.timestamp.as_ref()),
        content,
        reply_to,
    })
}

/// Reply-context id: nested `message.replied_id`, then flat
/// `quoted_message_id`, then `in_reply_to`.
fn reply_context(payload: &RawPayload) -> Option<String> {
    payload
        .message_object()
        .and_then(|m| m.replied_id.as_ref())
        .and_then(payload::id_string)
        .or_else(|| payload.quoted_message_id.as_ref().and_then(payload::id_string))
        .or_else(|| payload.in_reply_to.as_ref().and_then(payload::id_string))
}

/// Build the tagged content for the inferred kind. `None` means the payload
/// carries no usable content and the whole message is dropped — the guard
/// against hollow conversations.
fn build_content(payload: &RawPayload, kind: Kind) -> Option<MessageContent> {
    match kind {
        Kind::Text => {
            let body = payload
                .message_object()
                .and_then(|m| m.text.clone())
                .or_else(|| payload.message_text().map(str::to_string))
                .or_else(|| payload.content.clone())
                .or_else(|| payload.text.clone());
            let button_text = payload.button.as_ref().and_then(|b| b.text.clone());
            let button_reply_title = payload
                .interactive
                .as_ref()
                .and_then(|i| i.button_reply.as_ref())
                .and_then(|r| r.title.clone());
            let list_reply_title = payload
                .interactive
                .as_ref()
                .and_then(|i| i.list_reply.as_ref())
                .and_then(|r| r.title.clone());
            if blank(body.as_deref())
                && blank(button_text.as_deref())
                && blank(button_reply_title.as_deref())
                && blank(list_reply_title.as_deref())
            {
                return None;
            }
            Some(MessageContent::Text {
                body: body.unwrap_or_default(),
                button_text,
                button_reply_title,
                list_reply_title,
            })
        }
        Kind::Reaction => {
            let body = payload.reaction.as_ref().and_then(|r| r.message.clone())?;
            if body.trim().is_empty() {
                return None;
            }
            Some(MessageContent::Reaction { body })
        }
        Kind::Image => extract_media(payload, kind).map(MessageContent::Image),
        Kind::Video => extract_media(payload, kind).map(MessageContent::Video),
        Kind::Audio => extract_media(payload, kind).map(MessageContent::Audio),
        Kind::Document => extract_media(payload, kind).map(MessageContent::Document),
        Kind::Sticker => extract_media(payload, kind).map(MessageContent::Sticker),
        Kind::Location => build_location(payload).map(MessageContent::Location),
        Kind::Contacts => {
            let cards = build_contacts(payload);
            if cards.is_empty() {
                return None;
            }
            Some(MessageContent::Contacts(cards))
        }
    }
}

/// Media extraction: the structured per-kind block wins (with `media_path`
/// preferred over `id`); legacy flat `_url` fields are the fallback, with the
/// MIME type inferred from the file extension when absent.
fn extract_media(payload: &RawPayload, kind: Kind) -> Option<MediaAttachment> {
    let block = match kind {
        Kind::Image => payload.image.as_ref(),
        Kind::Video => payload.video.as_ref(),
        Kind::Audio => payload.audio.as_ref(),
        Kind::Document => payload.document.as_ref(),
        Kind::Sticker => payload.sticker.as_ref(),
        _ => None,
    };

    if let Some(media) = block {
        if let Some(id) = media.media_path.clone().or_else(|| media.id.clone()) {
            return Some(MediaAttachment {
                id,
                mime_type: media.mime_type.clone(),
                caption: if kind == Kind::Sticker {
                    None
                } else {
                    media.caption.clone()
                },
                filename: if kind == Kind::Document {
                    media.filename.clone()
                } else {
                    None
                },
            });
        }
    }

    let url = payload
        .image_url
        .clone()
        .or_else(|| payload.video_url.clone())
        .or_else(|| payload.audio_url.clone())
        .or_else(|| payload.document_url.clone())
        .or_else(|| payload.sticker_url.clone())
        .or_else(|| payload.media_url.clone())?;
    Some(MediaAttachment {
        mime_type: Some(
            payload
                .mime_type
                .clone()
                .unwrap_or_else(|| infer_mime_type(&url).to_string()),
        ),
        caption: payload.caption.clone(),
        filename: payload.filename.clone(),
        id: url,
    })
}

fn build_location(payload: &RawPayload) -> Option<Location> {
    let location = if let Some(block) = &payload.location {
        Location {
            latitude: block.degrees_latitude.or(block.latitude),
            longitude: block.degrees_longitude.or(block.longitude),
            name: block.name.clone(),
            address: block.address.clone(),
            url: block.url.clone(),
        }
    } else {
        Location {
            latitude: payload.latitude,
            longitude: payload.longitude,
            name: payload.location_name.clone(),
            address: payload.location_address.clone(),
            url: payload.location_url.clone(),
        }
    };
    if location.is_empty() { None } else { Some(location) }
}

fn build_contacts(payload: &RawPayload) -> Vec<ContactCard> {
    if let Some(card) = &payload.contact {
        return vec![ContactCard {
            vcard: card.vcard.clone(),
            formatted_name: card.display_name.clone(),
        }];
    }
    if let Some(vcard) = &payload.contact_vcard {
        return vec![ContactCard {
            vcard: Some(vcard.clone()),
            formatted_name: None,
        }];
    }
    if let Some(Value::Array(items)) = &payload.contacts {
        return items
            .iter()
            .map(|item| ContactCard {
                vcard: item
                    .get("vcard")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                formatted_name: item
                    .pointer("/name/formatted_name")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| {
                        item.get("displayName")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    }),
            })
            .collect();
    }
    Vec::new()
}

pub fn infer_mime_type(url: &str) -> &'static str {
    let file = url.rsplit('/').next().unwrap_or(url);
    let extension = match file.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    };
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Receipts locate their data through a possible second envelope level (the
/// outer object repeats `event: message.ack`), then fan out over every id in
/// the `ids` array with one shared status and timestamp.
fn normalize_receipt(envelope: &RawPayload) -> Normalized {
    let (receipt, timestamp_value) = match envelope.payload.as_deref() {
        Some(inner) if inner.event.as_deref() == Some("message.ack") => (
            inner.payload.as_deref().unwrap_or(inner),
            inner.timestamp.as_ref().or(envelope.timestamp.as_ref()),
        ),
        Some(inner) => (inner, envelope.timestamp.as_ref()),
        None => (envelope, envelope.timestamp.as_ref()),
    };

    let timestamp = payload::unix_timestamp(timestamp_value);
    let status = map_receipt_status(receipt.receipt_type.as_deref());
    let updates = receipt
        .ids
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|external_id| StatusUpdate {
            external_id,
            status,
            timestamp,
        })
        .collect();
    Normalized::Statuses(updates)
}

/// Unrecognized receipt labels degrade to `delivered` rather than being
/// dropped — losing a read marker beats losing the receipt.
fn map_receipt_status(label: Option<&str>) -> DeliveryStatus {
    match label.map(str::to_ascii_lowercase).as_deref() {
        Some("read") => DeliveryStatus::Read,
        Some("sent") => DeliveryStatus::Sent,
        _ => DeliveryStatus::Delivered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHANNEL: &str = "5559999";

    fn raw(value: Value) -> RawPayload {
        serde_json::from_value(value).expect("payload parses")
    }

    fn normalize_message_event(value: Value) -> Normalized {
        let envelope = raw(value);
        normalize(&envelope, EventKind::Message, CHANNEL)
    }

    fn single_message(normalized: &Normalized) -> &CanonicalMessage {
        match normalized {
            Normalized::Messages { messages, .. } => &messages[0],
            other => panic!("expected messages, got {:?}", other),
        }
    }

    // --- content guards ---

    #[test]
    fn payload_without_message_or_text_is_empty() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net"
        }));
        assert_eq!(result, Normalized::Empty);
    }

    #[test]
    fn blank_text_body_is_dropped() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc", "text": "   " }
        }));
        assert_eq!(result, Normalized::Empty);
    }

    #[test]
    fn unknown_explicit_type_is_dropped() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "type": "poll",
            "message": { "id": "abc" }
        }));
        assert_eq!(result, Normalized::Empty);
    }

    // --- contact extraction ---

    #[test]
    fn incoming_contacts_synthesize_channel_destination() {
        let result = normalize_message_event(json!({
            "from": "5551234:14@s.whatsapp.net",
            "pushname": "Alice",
            "message": { "id": "abc", "text": "hi" }
        }));
        let Normalized::Messages { from, to, .. } = result else {
            panic!("expected messages");
        };
        assert_eq!(from.identifier, "5551234@s.whatsapp.net");
        assert_eq!(from.source_id, "5551234");
        assert_eq!(from.name, "Alice");
        assert_eq!(from.phone_number.as_deref(), Some("+5551234"));

        assert_eq!(to.identifier, "5559999@s.whatsapp.net");
        assert_eq!(to.source_id, "5559999");
        assert_eq!(to.phone_number.as_deref(), Some("+5559999"));
    }

    #[test]
    fn missing_pushname_falls_back_to_phone() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc", "text": "hi" }
        }));
        let Normalized::Messages { from, .. } = result else {
            panic!("expected messages");
        };
        assert_eq!(from.name, "+5551234");
    }

    #[test]
    fn routed_from_field_selects_both_sides() {
        let result = normalize_message_event(json!({
            "from": "5551234:14@s.whatsapp.net in 5558888@s.whatsapp.net",
            "message": { "id": "abc", "text": "hi" }
        }));
        let Normalized::Messages { from, to, .. } = result else {
            panic!("expected messages");
        };
        assert_eq!(from.identifier, "5551234@s.whatsapp.net");
        assert_eq!(to.identifier, "5558888@s.whatsapp.net");
        assert_eq!(to.source_id, "5558888");
    }

    #[test]
    fn self_addressed_falls_back_to_from_side_extraction() {
        let result = normalize_message_event(json!({
            "from": "5559999@s.whatsapp.net",
            "message": { "id": "abc", "text": "note to self" }
        }));
        let Normalized::Messages { to, .. } = result else {
            panic!("expected messages");
        };
        assert_eq!(to.identifier, "5559999@s.whatsapp.net");
    }

    #[test]
    fn group_destination_keeps_full_identifier_and_drops_phone() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net in 120363043968000@g.us",
            "pushname": "Alice",
            "message": { "id": "abc", "text": "hi all" }
        }));
        let Normalized::Messages { to, .. } = result else {
            panic!("expected messages");
        };
        assert_eq!(to.source_id, "120363043968000@g.us");
        assert_eq!(to.phone_number, None);
    }

    // --- message kinds ---

    #[test]
    fn text_from_nested_message_object() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "timestamp": 1_700_000_000,
            "message": { "id": "abc", "text": "hello" }
        }));
        let msg = single_message(&result).clone();
        assert_eq!(msg.external_id.as_deref(), Some("abc"));
        assert_eq!(msg.timestamp, 1_700_000_000);
        assert_eq!(msg.content, MessageContent::text("hello"));
    }

    #[test]
    fn text_from_legacy_string_message() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": "plain old text"
        }));
        let msg = single_message(&result).clone();
        assert_eq!(msg.external_id, None);
        assert_eq!(msg.content, MessageContent::text("plain old text"));
    }

    #[test]
    fn text_falls_back_to_flat_content_then_text() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "content": "from content",
            "text": "from text"
        }));
        assert_eq!(
            single_message(&result).content,
            MessageContent::text("from content")
        );
    }

    #[test]
    fn reaction_takes_precedence_and_sets_reply_target() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "r1" },
            "image_url": "http://example.com/x.jpg",
            "reaction": { "message": "original text", "id": "target-42" }
        }));
        let msg = single_message(&result).clone();
        assert_eq!(
            msg.content,
            MessageContent::Reaction {
                body: "original text".into()
            }
        );
        assert_eq!(msg.reply_to.as_deref(), Some("target-42"));
    }

    #[test]
    fn structured_media_block_prefers_media_path() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "image": {
                "id": "ignored",
                "media_path": "statics/media/photo.jpg",
                "mime_type": "image/jpeg",
                "caption": "look"
            }
        }));
        let MessageContent::Image(media) = &single_message(&result).content else {
            panic!("expected image");
        };
        assert_eq!(media.id, "statics/media/photo.jpg");
        assert_eq!(media.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(media.caption.as_deref(), Some("look"));
    }

    #[test]
    fn legacy_url_media_infers_mime_from_extension() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "document_url": "http://example.com/files/report.pdf",
            "caption": "q3",
            "filename": "report.pdf"
        }));
        let MessageContent::Document(media) = &single_message(&result).content else {
            panic!("expected document");
        };
        assert_eq!(media.id, "http://example.com/files/report.pdf");
        assert_eq!(media.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(media.filename.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn legacy_media_type_label_selects_kind() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "media_type": "audio",
            "media_url": "http://example.com/voice.ogg"
        }));
        let MessageContent::Audio(media) = &single_message(&result).content else {
            panic!("expected audio");
        };
        // .ogg is not in the legacy table; conservative default applies
        assert_eq!(media.mime_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn sticker_block_drops_caption() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "sticker": { "media_path": "statics/s.webp", "mime_type": "image/webp", "caption": "x" }
        }));
        let MessageContent::Sticker(media) = &single_message(&result).content else {
            panic!("expected sticker");
        };
        assert_eq!(media.caption, None);
    }

    #[test]
    fn location_block_prefers_degrees_fields() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "location": { "degreesLatitude": -23.55, "degreesLongitude": -46.63, "name": "HQ" }
        }));
        let MessageContent::Location(loc) = &single_message(&result).content else {
            panic!("expected location");
        };
        assert_eq!(loc.latitude, Some(-23.55));
        assert_eq!(loc.name.as_deref(), Some("HQ"));
    }

    #[test]
    fn legacy_flat_latitude_longitude() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "latitude": 1.5,
            "longitude": 2.5
        }));
        let MessageContent::Location(loc) = &single_message(&result).content else {
            panic!("expected location");
        };
        assert_eq!((loc.latitude, loc.longitude), (Some(1.5), Some(2.5)));
    }

    #[test]
    fn empty_location_block_is_dropped() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "location": {}
        }));
        assert_eq!(result, Normalized::Empty);
    }

    #[test]
    fn contact_card_from_structured_block() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "contact": { "displayName": "Bob", "vcard": "BEGIN:VCARD..." }
        }));
        let MessageContent::Contacts(cards) = &single_message(&result).content else {
            panic!("expected contacts");
        };
        assert_eq!(cards[0].formatted_name.as_deref(), Some("Bob"));
        assert_eq!(cards[0].vcard.as_deref(), Some("BEGIN:VCARD..."));
    }

    #[test]
    fn contacts_passthrough_array() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc" },
            "contacts": [ { "name": { "formatted_name": "Carol" } } ]
        }));
        let MessageContent::Contacts(cards) = &single_message(&result).content else {
            panic!("expected contacts");
        };
        assert_eq!(cards[0].formatted_name.as_deref(), Some("Carol"));
    }

    // --- reply context ---

    #[test]
    fn reply_context_precedence() {
        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc", "text": "hi", "replied_id": "nested" },
            "quoted_message_id": "quoted",
            "in_reply_to": "flat"
        }));
        assert_eq!(single_message(&result).reply_to.as_deref(), Some("nested"));

        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc", "text": "hi" },
            "quoted_message_id": "quoted",
            "in_reply_to": "flat"
        }));
        assert_eq!(single_message(&result).reply_to.as_deref(), Some("quoted"));

        let result = normalize_message_event(json!({
            "from": "5551234@s.whatsapp.net",
            "message": { "id": "abc", "text": "hi" },
            "in_reply_to": 777
        }));
        assert_eq!(single_message(&result).reply_to.as_deref(), Some("777"));
    }

    // --- receipts ---

    #[test]
    fn receipt_fans_out_over_all_ids() {
        let envelope = raw(json!({
            "event": "message.ack",
            "payload": { "ids": ["abc", "def"], "receipt_type": "read" },
            "timestamp": 1_700_000_000
        }));
        let Normalized::Statuses(updates) = normalize(&envelope, EventKind::Ack, CHANNEL) else {
            panic!("expected statuses");
        };
        assert_eq!(updates.len(), 2);
        for update in &updates {
            assert_eq!(update.status, DeliveryStatus::Read);
            assert_eq!(update.timestamp, 1_700_000_000);
        }
        assert_eq!(updates[0].external_id, "abc");
        assert_eq!(updates[1].external_id, "def");
    }

    #[test]
    fn double_nested_receipt_envelope() {
        let envelope = raw(json!({
            "event": "message.ack",
            "payload": {
                "event": "message.ack",
                "payload": { "ids": ["xyz"], "receipt_type": "delivered" },
                "timestamp": 1_700_000_999
            }
        }));
        let Normalized::Statuses(updates) = normalize(&envelope, EventKind::Ack, CHANNEL) else {
            panic!("expected statuses");
        };
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].external_id, "xyz");
        assert_eq!(updates[0].status, DeliveryStatus::Delivered);
        assert_eq!(updates[0].timestamp, 1_700_000_999);
    }

    #[test]
    fn unknown_receipt_type_degrades_to_delivered() {
        let envelope = raw(json!({
            "event": "message.ack",
            "payload": { "ids": ["abc"], "receipt_type": "played" }
        }));
        let Normalized::Statuses(updates) = normalize(&envelope, EventKind::Ack, CHANNEL) else {
            panic!("expected statuses");
        };
        assert_eq!(updates[0].status, DeliveryStatus::Delivered);
    }

    #[test]
    fn receipt_status_mapping_is_case_insensitive() {
        assert_eq!(map_receipt_status(Some("READ")), DeliveryStatus::Read);
        assert_eq!(map_receipt_status(Some("Sent")), DeliveryStatus::Sent);
        assert_eq!(map_receipt_status(Some("delivered")), DeliveryStatus::Delivered);
        assert_eq!(map_receipt_status(None), DeliveryStatus::Delivered);
    }

    #[test]
    fn receipt_without_ids_produces_no_updates() {
        let envelope = raw(json!({
            "event": "message.ack",
            "payload": { "receipt_type": "read" }
        }));
        assert_eq!(
            normalize(&envelope, EventKind::Ack, CHANNEL),
            Normalized::Statuses(Vec::new())
        );
    }

    // --- mime inference table ---

    #[test]
    fn mime_inference_table() {
        assert_eq!(infer_mime_type("a/b.jpg"), "image/jpeg");
        assert_eq!(infer_mime_type("a/b.JPEG"), "image/jpeg");
        assert_eq!(infer_mime_type("a/b.png"), "image/png");
        assert_eq!(infer_mime_type("a/b.gif"), "image/gif");
        assert_eq!(infer_mime_type("a/b.mp4"), "video/mp4");
        assert_eq!(infer_mime_type("a/b.mp3"), "audio/mpeg");
        assert_eq!(infer_mime_type("a/b.wav"), "audio/wav");
        assert_eq!(infer_mime_type("a/b.pdf"), "application/pdf");
        assert_eq!(infer_mime_type("a/b.doc"), "application/msword");
        assert_eq!(
            infer_mime_type("a/b.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(infer_mime_type("a/b"), "application/octet-stream");
        assert_eq!(infer_mime_type("a/b.xyz"), "application/octet-stream");
    }
}
