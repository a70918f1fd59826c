//! Durable-store collaborator interfaces.
//!
//! The pipeline owns no persistence. These traits describe the operations it
//! needs from the surrounding system; [`memory`] provides the reference
//! implementation used by tests and the demo binary. The uniqueness
//! constraint on `(channel_id, source_id)` bindings is the idempotency
//! anchor: `create_binding` must fail with [`StoreError::Conflict`] when the
//! pair already exists, and callers re-fetch the winner's record.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{DeliveryStatus, MediaAttachment};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("binding already exists for ({channel_id}, {source_id})")]
    Conflict {
        channel_id: String,
        source_id: String,
    },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub phone_number: Option<String>,
    /// Canonical chat address; a soft uniqueness hint, not authoritative.
    pub identifier: Option<String>,
    pub avatar_attached: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub phone_number: Option<String>,
    pub identifier: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub identifier: Option<String>,
}

/// Durable link between a gateway-specific source id and a contact.
/// At most one binding exists per `(channel_id, source_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: Uuid,
    pub channel_id: String,
    pub source_id: String,
    pub contact_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub binding_id: Uuid,
    pub contact_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: Direction,
    pub sender_id: Uuid,
    /// Gateway message id, used for receipt correlation and dedup.
    pub external_id: Option<String>,
    pub content: String,
    pub attachment: Option<MediaAttachment>,
    pub reply_to_external_id: Option<String>,
    pub status: DeliveryStatus,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub direction: Direction,
    pub sender_id: Uuid,
    pub external_id: Option<String>,
    pub content: String,
    pub attachment: Option<MediaAttachment>,
    pub reply_to_external_id: Option<String>,
    pub timestamp: i64,
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, StoreError>;
    async fn create_contact(&self, attributes: NewContact) -> Result<Contact, StoreError>;
    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> Result<Contact, StoreError>;
}

#[async_trait]
pub trait BindingStore: Send + Sync {
    async fn find_binding(
        &self,
        channel_id: &str,
        source_id: &str,
    ) -> Result<Option<Binding>, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the pair already exists —
    /// the loser of a concurrent create race re-fetches instead of erroring.
    async fn create_binding(
        &self,
        channel_id: &str,
        source_id: &str,
        contact_id: Uuid,
    ) -> Result<Binding, StoreError>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_or_reuse_conversation(
        &self,
        binding: &Binding,
    ) -> Result<Conversation, StoreError>;

    async fn create_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError>;

    async fn find_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredMessage>, StoreError>;

    /// Returns `false` when no message carries the external id — receipts
    /// routinely reference messages the store has never seen.
    async fn update_message_status(
        &self,
        external_id: &str,
        status: DeliveryStatus,
        timestamp: i64,
    ) -> Result<bool, StoreError>;
}

/// Fire-and-forget async work dispatch. The pipeline never blocks on these
/// jobs and treats scheduling failures as non-fatal.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn schedule_avatar_fetch(&self, contact_id: Uuid, url: &str) -> Result<(), StoreError>;
}
