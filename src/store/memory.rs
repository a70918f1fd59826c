//! In-memory store. One mutex-protected map per record family; the binding
//! map's key is `(channel_id, source_id)`, which is exactly the uniqueness
//! constraint the resolver relies on.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{
    Binding, BindingStore, Contact, ContactPatch, ContactStore, Conversation, ConversationStore,
    JobDispatcher, NewContact, NewMessage, StoreError, StoredMessage,
};
use crate::model::DeliveryStatus;

#[derive(Default)]
pub struct InMemoryStore {
    contacts: Mutex<HashMap<Uuid, Contact>>,
    bindings: Mutex<HashMap<(String, String), Binding>>,
    conversations: Mutex<HashMap<Uuid, Conversation>>,
    messages: Mutex<Vec<StoredMessage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn contact_count(&self) -> usize {
        Self::lock(&self.contacts).len()
    }

    pub fn binding_count(&self) -> usize {
        Self::lock(&self.bindings).len()
    }

    pub fn message_count(&self) -> usize {
        Self::lock(&self.messages).len()
    }

    pub fn messages(&self) -> Vec<StoredMessage> {
        Self::lock(&self.messages).clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        Self::lock(&self.contacts).values().cloned().collect()
    }

    pub fn bindings(&self) -> Vec<Binding> {
        Self::lock(&self.bindings).values().cloned().collect()
    }

    /// Mark a contact as having an attached avatar (test fixture hook; the
    /// real attachment is owned by the avatar worker).
    pub fn attach_avatar(&self, id: Uuid) {
        if let Some(contact) = Self::lock(&self.contacts).get_mut(&id) {
            contact.avatar_attached = true;
            contact.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl ContactStore for InMemoryStore {
    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        Ok(Self::lock(&self.contacts).get(&id).cloned())
    }

    async fn create_contact(&self, attributes: NewContact) -> Result<Contact, StoreError> {
        let contact = Contact {
            id: Uuid::new_v4(),
            name: attributes.name,
            phone_number: attributes.phone_number,
            identifier: attributes.identifier,
            avatar_attached: false,
            updated_at: Utc::now(),
        };
        Self::lock(&self.contacts).insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update_contact(&self, id: Uuid, patch: ContactPatch) -> Result<Contact, StoreError> {
        let mut contacts = Self::lock(&self.contacts);
        let contact = contacts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("contact {}", id)))?;
        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(identifier) = patch.identifier {
            contact.identifier = Some(identifier);
        }
        contact.updated_at = Utc::now();
        Ok(contact.clone())
    }
}

#[async_trait]
impl BindingStore for InMemoryStore {
    async fn find_binding(
        &self,
        channel_id: &str,
        source_id: &str,
    ) -> Result<Option<Binding>, StoreError> {
        let key = (channel_id.to_string(), source_id.to_string());
        Ok(Self::lock(&self.bindings).get(&key).cloned())
    }

    async fn create_binding(
        &self,
        channel_id: &str,
        source_id: &str,
        contact_id: Uuid,
    ) -> Result<Binding, StoreError> {
        let key = (channel_id.to_string(), source_id.to_string());
        let mut bindings = Self::lock(&self.bindings);
        if bindings.contains_key(&key) {
            return Err(StoreError::Conflict {
                channel_id: channel_id.to_string(),
                source_id: source_id.to_string(),
            });
        }
        let binding = Binding {
            id: Uuid::new_v4(),
            channel_id: channel_id.to_string(),
            source_id: source_id.to_string(),
            contact_id,
        };
        bindings.insert(key, binding.clone());
        Ok(binding)
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn create_or_reuse_conversation(
        &self,
        binding: &Binding,
    ) -> Result<Conversation, StoreError> {
        let mut conversations = Self::lock(&self.conversations);
        if let Some(existing) = conversations.get(&binding.id) {
            return Ok(existing.clone());
        }
        let conversation = Conversation {
            id: Uuid::new_v4(),
            binding_id: binding.id,
            contact_id: binding.contact_id,
        };
        conversations.insert(binding.id, conversation.clone());
        Ok(conversation)
    }

    async fn create_message(
        &self,
        conversation_id: Uuid,
        message: NewMessage,
    ) -> Result<StoredMessage, StoreError> {
        let stored = StoredMessage {
            id: Uuid::new_v4(),
            conversation_id,
            direction: message.direction,
            sender_id: message.sender_id,
            external_id: message.external_id,
            content: message.content,
            attachment: message.attachment,
            reply_to_external_id: message.reply_to_external_id,
            status: DeliveryStatus::Sent,
            timestamp: message.timestamp,
        };
        Self::lock(&self.messages).push(stored.clone());
        Ok(stored)
    }

    async fn find_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<StoredMessage>, StoreError> {
        Ok(Self::lock(&self.messages)
            .iter()
            .find(|m| m.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn update_message_status(
        &self,
        external_id: &str,
        status: DeliveryStatus,
        timestamp: i64,
    ) -> Result<bool, StoreError> {
        let mut messages = Self::lock(&self.messages);
        let Some(message) = messages
            .iter_mut()
            .find(|m| m.external_id.as_deref() == Some(external_id))
        else {
            return Ok(false);
        };
        message.status = status;
        message.timestamp = timestamp;
        Ok(true)
    }
}

/// Dispatcher that only records the request in the log. Actual avatar
/// download mechanics belong to an external worker.
#[derive(Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl JobDispatcher for LoggingDispatcher {
    async fn schedule_avatar_fetch(&self, contact_id: Uuid, url: &str) -> Result<(), StoreError> {
        info!("avatar fetch scheduled: contact={}, url={}", contact_id, url);
        Ok(())
    }
}
