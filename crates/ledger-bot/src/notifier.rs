//! Telegram implementations of the engine's collaborator ports.

use crate::api::ChatApi;
use crate::render;
use async_trait::async_trait;
use ledger_core::UserId;
use ledger_engine::{MembershipCheck, MembershipStatus, Notice, Notifier, PortError};
use std::sync::Arc;

/// Delivers ledger notices as direct messages. Notices are not auto-deleted.
pub struct TelegramNotifier {
    api: Arc<dyn ChatApi>,
}

impl TelegramNotifier {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, to: UserId, notice: &Notice) -> Result<(), PortError> {
        self.api
            .send_message(to, &render::notice(notice))
            .await
            .map(|_| ())
            .map_err(|e| PortError(e.to_string()))
    }
}

/// Looks up membership of the public channel users must join
pub struct ChannelMembership {
    api: Arc<dyn ChatApi>,
    channel: String,
}

impl ChannelMembership {
    pub fn new(api: Arc<dyn ChatApi>, channel_username: &str) -> Self {
        Self {
            api,
            channel: format!("@{}", channel_username.trim_start_matches('@')),
        }
    }
}

#[async_trait]
impl MembershipCheck for ChannelMembership {
    async fn membership(&self, user_id: UserId) -> Result<MembershipStatus, PortError> {
        let status = self
            .api
            .get_chat_member(&self.channel, user_id)
            .await
            .map_err(|e| PortError(e.to_string()))?;
        Ok(MembershipStatus::from_api(&status))
    }
}
