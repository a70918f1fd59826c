//! Identity resolution.
//!
//! Given the (from, to) canonical descriptors of one message event, decides
//! the message's relational shape and resolves the durable contact and
//! binding records, creating them only when no binding exists for the
//! `(channel, source_id)` pair. The result is threaded as a value through
//! the materializer — resolution holds no state between payloads.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ChannelConfig;
use crate::ingest::identifier;
use crate::model::CanonicalContact;
use crate::store::{
    Binding, BindingStore, Contact, ContactPatch, ContactStore, JobDispatcher, NewContact,
    StoreError,
};

/// Where the avatar refresh path looks up a contact's current avatar URL.
/// Implemented by the gateway client; failures are swallowed by the caller.
#[async_trait]
pub trait AvatarSource: Send + Sync {
    async fn avatar_url(&self, identifier: &str) -> anyhow::Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// The sender's number is the channel's own number.
    OutgoingFromCompany,
    /// The destination identifier carries the group suffix.
    IncomingToGroup,
    Incoming,
}

/// Resolved relational shape for one message event. `contact`/`binding`
/// anchor the conversation; `sender` is the message's sender-of-record
/// (the company contact for outgoing, the external human otherwise).
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub routing: Routing,
    pub contact: Contact,
    pub binding: Binding,
    pub sender: Contact,
}

pub struct IdentityResolver {
    contacts: Arc<dyn ContactStore>,
    bindings: Arc<dyn BindingStore>,
    dispatcher: Arc<dyn JobDispatcher>,
    avatars: Arc<dyn AvatarSource>,
    channel: ChannelConfig,
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl IdentityResolver {
    pub fn new(
        contacts: Arc<dyn ContactStore>,
        bindings: Arc<dyn BindingStore>,
        dispatcher: Arc<dyn JobDispatcher>,
        avatars: Arc<dyn AvatarSource>,
        channel: ChannelConfig,
    ) -> Self {
        Self {
            contacts,
            bindings,
            dispatcher,
            avatars,
            channel,
        }
    }

    /// Resolve both sides of one message event. `Ok(None)` means the
    /// descriptors carry too little identity to anchor a conversation —
    /// the payload is skipped, never failed.
    pub async fn resolve(
        &self,
        from: &CanonicalContact,
        to: &CanonicalContact,
    ) -> Result<Option<ResolutionResult>, StoreError> {
        if blank(&from.identifier) {
            warn!("identity: no sender identifier, skipping payload");
            return Ok(None);
        }

        if self.from_company(from) {
            info!("identity: outgoing message from company number");
            if blank(&to.identifier) {
                warn!("identity: outgoing message without recipient identifier, skipping");
                return Ok(None);
            }
            let (contact, binding) = self.resolve_binding(to).await?;
            self.maybe_refresh_avatar(&contact, to).await;
            let sender = self.resolve_company_contact(from).await?;
            return Ok(Some(ResolutionResult {
                routing: Routing::OutgoingFromCompany,
                contact,
                binding,
                sender,
            }));
        }

        if to.is_group() {
            info!("identity: incoming message to group {}", to.identifier);
            let (sender, _) = self.resolve_binding(from).await?;
            let sender = self.refresh_display_name(sender, from).await?;
            self.maybe_refresh_avatar(&sender, from).await;

            // Groups are name-only contacts; they never carry a phone number.
            let mut group = to.clone();
            group.phone_number = None;
            let (contact, binding) = self.resolve_binding(&group).await?;
            return Ok(Some(ResolutionResult {
                routing: Routing::IncomingToGroup,
                contact,
                binding,
                sender,
            }));
        }

        info!("identity: incoming message from external contact");
        let (contact, binding) = self.resolve_binding(from).await?;
        let contact = self.refresh_display_name(contact, from).await?;
        self.maybe_refresh_avatar(&contact, from).await;
        Ok(Some(ResolutionResult {
            routing: Routing::Incoming,
            contact: contact.clone(),
            binding,
            sender: contact,
        }))
    }

    fn from_company(&self, from: &CanonicalContact) -> bool {
        let company_number = identifier::extract_number(&self.channel.phone_number);
        !company_number.is_empty()
            && identifier::extract_number(&from.identifier) == company_number
    }

    /// Lookup-before-create against the `(channel, source_id)` uniqueness
    /// anchor. A conflict means another delivery won the create race; the
    /// winner's records are re-fetched instead of erroring.
    async fn resolve_binding(
        &self,
        descriptor: &CanonicalContact,
    ) -> Result<(Contact, Binding), StoreError> {
        let source_id = self.processed_source_id(descriptor);
        let channel_id = self.channel.channel_id.as_str();

        if let Some(existing) = self.bindings.find_binding(channel_id, &source_id).await? {
            debug!("identity: reusing binding for source_id {}", source_id);
            let contact = self.fetch_contact(existing.contact_id).await?;
            return Ok((contact, existing));
        }

        let contact = self
            .contacts
            .create_contact(NewContact {
                name: descriptor.name.clone(),
                phone_number: descriptor.phone_number.clone(),
                identifier: Some(descriptor.identifier.clone()).filter(|s| !blank(s)),
            })
            .await?;

        match self
            .bindings
            .create_binding(channel_id, &source_id, contact.id)
            .await
        {
            Ok(binding) => Ok((contact, binding)),
            Err(StoreError::Conflict { .. }) => {
                debug!(
                    "identity: lost create race for source_id {}, re-fetching winner",
                    source_id
                );
                let binding = self
                    .bindings
                    .find_binding(channel_id, &source_id)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Backend(format!(
                            "binding for ({}, {}) vanished after conflict",
                            channel_id, source_id
                        ))
                    })?;
                let contact = self.fetch_contact(binding.contact_id).await?;
                Ok((contact, binding))
            }
            Err(e) => Err(e),
        }
    }

    /// The company's own identity as sender-of-record for outgoing messages.
    /// Its stored phone number is always the channel's canonical number,
    /// whatever the raw descriptor carried.
    async fn resolve_company_contact(
        &self,
        descriptor: &CanonicalContact,
    ) -> Result<Contact, StoreError> {
        let mut company = descriptor.clone();
        company.phone_number = Some(self.channel.phone_number.clone());
        let (contact, _) = self.resolve_binding(&company).await?;
        Ok(contact)
    }

    fn processed_source_id(&self, descriptor: &CanonicalContact) -> String {
        if blank(&descriptor.source_id) {
            // No natural identifier on this side; mint a unique token so the
            // binding still has an anchor.
            return Uuid::new_v4().simple().to_string();
        }
        descriptor.source_id.clone()
    }

    async fn fetch_contact(&self, id: Uuid) -> Result<Contact, StoreError> {
        self.contacts
            .find_contact(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("contact {}", id)))
    }

    /// Overwrite a stored display name only when the candidate is a real
    /// name (not just the formatted phone number) and the current name still
    /// is the phone number — a user-entered name is never clobbered.
    async fn refresh_display_name(
        &self,
        contact: Contact,
        descriptor: &CanonicalContact,
    ) -> Result<Contact, StoreError> {
        let candidate = descriptor.name.trim();
        if candidate.is_empty() {
            return Ok(contact);
        }
        if descriptor.phone_number.as_deref() == Some(candidate) {
            return Ok(contact);
        }
        let current_is_phone = contact
            .phone_number
            .as_deref()
            .is_some_and(|phone| contact.name == phone);
        if !current_is_phone || contact.name == candidate {
            return Ok(contact);
        }

        info!(
            "identity: refreshing display name for contact {}: {:?} -> {:?}",
            contact.id, contact.name, candidate
        );
        self.contacts
            .update_contact(
                contact.id,
                ContactPatch {
                    name: Some(candidate.to_string()),
                    ..ContactPatch::default()
                },
            )
            .await
    }

    /// Avatar refresh side effect: best-effort, never propagates.
    async fn maybe_refresh_avatar(&self, contact: &Contact, descriptor: &CanonicalContact) {
        if let Err(e) = self.refresh_avatar(contact, descriptor).await {
            error!(
                "identity: avatar refresh failed for contact {}: {}",
                contact.id, e
            );
        }
    }

    async fn refresh_avatar(
        &self,
        contact: &Contact,
        descriptor: &CanonicalContact,
    ) -> anyhow::Result<()> {
        let identifier = match contact
            .identifier
            .as_deref()
            .filter(|current| !blank(current))
        {
            Some(current) => current.to_string(),
            None => {
                if blank(&descriptor.identifier) {
                    debug!("identity: no identifier for contact {}, skipping avatar", contact.id);
                    return Ok(());
                }
                self.contacts
                    .update_contact(
                        contact.id,
                        ContactPatch {
                            identifier: Some(descriptor.identifier.clone()),
                            ..ContactPatch::default()
                        },
                    )
                    .await?;
                descriptor.identifier.clone()
            }
        };

        if contact.avatar_attached && contact.updated_at > Utc::now() - Duration::hours(24) {
            debug!("identity: contact {} has a recent avatar, skipping", contact.id);
            return Ok(());
        }

        let Some(url) = self.avatars.avatar_url(&identifier).await? else {
            debug!("identity: gateway has no avatar for {}", identifier);
            return Ok(());
        };
        self.dispatcher
            .schedule_avatar_fetch(contact.id, &url)
            .await?;
        Ok(())
    }
}
