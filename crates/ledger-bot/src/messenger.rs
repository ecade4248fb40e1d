use crate::api::ChatApi;
use crate::error::Result;
use crate::types::Reply;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sends bot messages so that each chat shows at most one at a time.
///
/// The previous message in the chat is deleted before a new one goes out, and
/// the new one is deleted again after `ttl` (zero keeps it).
#[derive(Clone)]
pub struct Messenger {
    api: Arc<dyn ChatApi>,
    last_message: Arc<DashMap<i64, i64>>,
    ttl: Duration,
}

impl Messenger {
    pub fn new(api: Arc<dyn ChatApi>, ttl: Duration) -> Self {
        Self {
            api,
            last_message: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub async fn send(&self, chat_id: i64, reply: &Reply) -> Result<i64> {
        let previous = self.last_message.remove(&chat_id).map(|(_, id)| id);
        if let Some(previous) = previous {
            if let Err(e) = self.api.delete_message(chat_id, previous).await {
                debug!(chat_id, message_id = previous, error = %e, "Previous message already gone");
            }
        }

        let message_id = self.api.send_message(chat_id, reply).await?;
        self.last_message.insert(chat_id, message_id);

        if !self.ttl.is_zero() {
            self.schedule_delete(chat_id, message_id);
        }
        Ok(message_id)
    }

    fn schedule_delete(&self, chat_id: i64, message_id: i64) {
        let api = self.api.clone();
        let last_message = self.last_message.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            last_message.remove_if(&chat_id, |_, id| *id == message_id);
            if let Err(e) = api.delete_message(chat_id, message_id).await {
                debug!(chat_id, message_id, error = %e, "Expired message already gone");
            }
        });
    }

    /// Message currently tracked for `chat_id`
    pub fn last_message(&self, chat_id: i64) -> Option<i64> {
        self.last_message.get(&chat_id).map(|id| *id)
    }
}
