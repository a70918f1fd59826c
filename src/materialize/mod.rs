//! Message materialization.
//!
//! Builds the durable message from one canonical record plus the resolver's
//! classification. Direction and sender are taken from the resolution as-is
//! — nothing here re-derives who sent what. Messages carrying an external id
//! the store has already seen are skipped, which is what makes gateway
//! redeliveries harmless.

use tracing::debug;

use crate::identity::{ResolutionResult, Routing};
use crate::model::{CanonicalMessage, MessageContent};
use crate::store::{ConversationStore, Direction, NewMessage, StoreError, StoredMessage};

/// Persist one canonical message. `Ok(None)` means the message was already
/// stored (external-id dedup) and nothing was written.
pub async fn materialize(
    store: &dyn ConversationStore,
    resolution: &ResolutionResult,
    message: &CanonicalMessage,
) -> Result<Option<StoredMessage>, StoreError> {
    if let Some(external_id) = message.external_id.as_deref().filter(|id| !id.is_empty()) {
        if store
            .find_message_by_external_id(external_id)
            .await?
            .is_some()
        {
            debug!("materialize: message {} already stored, skipping", external_id);
            return Ok(None);
        }
    }

    let conversation = store
        .create_or_reuse_conversation(&resolution.binding)
        .await?;

    let direction = match resolution.routing {
        Routing::OutgoingFromCompany => Direction::Outgoing,
        Routing::IncomingToGroup | Routing::Incoming => Direction::Incoming,
    };

    let stored = store
        .create_message(
            conversation.id,
            NewMessage {
                direction,
                sender_id: resolution.sender.id,
                external_id: message.external_id.clone(),
                content: derive_body(&message.content),
                attachment: message.content.attachment().cloned(),
                reply_to_external_id: message.reply_to.clone(),
                timestamp: message.timestamp,
            },
        )
        .await?;
    Ok(Some(stored))
}

/// Content body derivation: text body, button reply text, interactive
/// button-reply title, interactive list-reply title, contact-share formatted
/// name — first non-empty wins. Location and contact shares without a usable
/// body get fixed placeholders.
fn derive_body(content: &MessageContent) -> String {
    match content {
        MessageContent::Text {
            body,
            button_text,
            button_reply_title,
            list_reply_title,
        } => [
            Some(body.as_str()),
            button_text.as_deref(),
            button_reply_title.as_deref(),
            list_reply_title.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.trim().is_empty())
        .unwrap_or_default()
        .to_string(),
        MessageContent::Reaction { body } => body.clone(),
        MessageContent::Location(_) => "Location shared".to_string(),
        MessageContent::Contacts(cards) => cards
            .iter()
            .find_map(|card| {
                card.formatted_name
                    .as_deref()
                    .filter(|name| !name.trim().is_empty())
            })
            .unwrap_or("Contact shared")
            .to_string(),
        MessageContent::Image(media)
        | MessageContent::Video(media)
        | MessageContent::Audio(media)
        | MessageContent::Document(media)
        | MessageContent::Sticker(media) => media.caption.clone().unwrap_or_default(),
    }
}
