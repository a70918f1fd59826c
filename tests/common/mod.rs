// Shared test helpers — not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use wabridge::config::ChannelConfig;
use wabridge::identity::{AvatarSource, IdentityResolver};
use wabridge::ingest::Pipeline;
use wabridge::store::memory::InMemoryStore;
use wabridge::store::{JobDispatcher, StoreError};

pub const CHANNEL_NUMBER: &str = "5559999";

pub struct StaticAvatarSource(pub Option<String>);

#[async_trait]
impl AvatarSource for StaticAvatarSource {
    async fn avatar_url(&self, _identifier: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    pub calls: Mutex<Vec<(uuid::Uuid, String)>>,
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn schedule_avatar_fetch(
        &self,
        contact_id: uuid::Uuid,
        url: &str,
    ) -> Result<(), StoreError> {
        self.calls
            .lock()
            .expect("lock dispatcher calls")
            .push((contact_id, url.to_string()));
        Ok(())
    }
}

pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub pipeline: Arc<Pipeline>,
}

pub fn harness() -> TestHarness {
    harness_with_avatar(None)
}

pub fn harness_with_avatar(avatar_url: Option<&str>) -> TestHarness {
    let store = Arc::new(InMemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let channel = ChannelConfig {
        phone_number: CHANNEL_NUMBER.to_string(),
        channel_id: "whatsapp-web".to_string(),
    };
    let resolver = IdentityResolver::new(
        store.clone(),
        store.clone(),
        dispatcher.clone(),
        Arc::new(StaticAvatarSource(avatar_url.map(str::to_string))),
        channel.clone(),
    );
    let pipeline = Arc::new(Pipeline::new(resolver, store.clone(), channel));
    TestHarness {
        store,
        dispatcher,
        pipeline,
    }
}

pub fn text_payload(from: &str, pushname: &str, id: &str, text: &str) -> Value {
    json!({
        "event": "message",
        "from": from,
        "pushname": pushname,
        "message": { "id": id, "text": text }
    })
}

pub fn receipt_payload(ids: &[&str], receipt_type: &str, timestamp: i64) -> Value {
    json!({
        "event": "message.ack",
        "payload": { "ids": ids, "receipt_type": receipt_type },
        "timestamp": timestamp
    })
}
