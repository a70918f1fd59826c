//! Webhook ingestion pipeline.
//!
//! One delivery in, one [`Outcome`] out: classify the event, normalize the
//! payload into canonical form, resolve identities, materialize messages (or
//! apply receipt statuses). The pipeline is a pure transform over the durable
//! stores — it holds no state between deliveries, and no error from a
//! third-party payload ever escapes it.

pub mod classify;
pub mod identifier;
pub mod normalize;
pub mod payload;

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::identity::IdentityResolver;
use crate::materialize;
use crate::model::{CanonicalContact, CanonicalMessage, Normalized, Outcome, StatusUpdate};
use crate::store::ConversationStore;

use payload::RawPayload;

pub struct Pipeline {
    resolver: IdentityResolver,
    conversations: Arc<dyn ConversationStore>,
    channel: ChannelConfig,
}

impl Pipeline {
    pub fn new(
        resolver: IdentityResolver,
        conversations: Arc<dyn ConversationStore>,
        channel: ChannelConfig,
    ) -> Self {
        Self {
            resolver,
            conversations,
            channel,
        }
    }

    /// Process one decoded webhook delivery.
    pub async fn process(&self, raw: &Value) -> Outcome {
        let envelope: RawPayload = match serde_json::from_value(raw.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("gateway webhook: undecodable payload: {}", e);
                return Outcome::Skipped;
            }
        };

        let kind = classify::classify(envelope.event_label(), envelope.inner());
        debug!("gateway webhook: classified delivery as {:?}", kind);

        match normalize::normalize(&envelope, kind, &self.channel.phone_number) {
            Normalized::Empty => Outcome::Skipped,
            Normalized::Statuses(updates) => self.apply_statuses(updates).await,
            Normalized::Messages { from, to, messages } => {
                self.create_messages(&from, &to, &messages).await
            }
        }
    }

    /// Receipts update every referenced message; one miss or store failure
    /// never stops the rest of the batch.
    async fn apply_statuses(&self, updates: Vec<StatusUpdate>) -> Outcome {
        let total = updates.len();
        let mut applied = 0;
        for update in updates {
            match self
                .conversations
                .update_message_status(&update.external_id, update.status, update.timestamp)
                .await
            {
                Ok(true) => applied += 1,
                Ok(false) => {
                    debug!(
                        "gateway webhook: receipt for unknown message id {}",
                        update.external_id
                    );
                }
                Err(e) => {
                    warn!(
                        "gateway webhook: failed to apply status for {}: {}",
                        update.external_id, e
                    );
                }
            }
        }
        info!("gateway webhook: applied {}/{} status updates", applied, total);
        Outcome::StatusesApplied { applied, total }
    }

    async fn create_messages(
        &self,
        from: &CanonicalContact,
        to: &CanonicalContact,
        messages: &[CanonicalMessage],
    ) -> Outcome {
        if messages.is_empty() {
            return Outcome::Skipped;
        }

        let resolution = match self.resolver.resolve(from, to).await {
            Ok(Some(resolution)) => resolution,
            Ok(None) => return Outcome::Skipped,
            Err(e) => {
                warn!("gateway webhook: identity resolution failed: {}", e);
                return Outcome::Skipped;
            }
        };

        let mut conversation_id = None;
        let mut message_ids = Vec::new();
        for message in messages {
            match materialize::materialize(self.conversations.as_ref(), &resolution, message).await
            {
                Ok(Some(stored)) => {
                    conversation_id = Some(stored.conversation_id);
                    message_ids.push(stored.id);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "gateway webhook: failed to materialize message for contact {}: {}",
                        resolution.contact.id, e
                    );
                }
            }
        }

        match conversation_id {
            Some(conversation_id) => Outcome::Created {
                conversation_id,
                message_ids,
            },
            None => Outcome::Skipped,
        }
    }
}
