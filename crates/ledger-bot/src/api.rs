//! Telegram Bot API client.

use crate::error::{BotError, Result};
use crate::types::{ApiResponse, ChatMember, Reply, TgUser};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.telegram.org";

/// Outbound chat operations the bot relies on
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Returns the id of the sent message
    async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<i64>;

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, reply: &Reply) -> Result<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()>;

    /// Raw membership status string (`member`, `left`, ...)
    async fn get_chat_member(&self, chat: &str, user_id: i64) -> Result<String>;

    async fn get_me(&self) -> Result<TgUser>;
}

/// HTTP client for one bot token
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Result<Self> {
        Self::with_base_url(API_BASE, bot_token)
    }

    pub fn with_base_url(api_base: &str, bot_token: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &'static str, payload: &Value) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self.client.post(&url).json(payload).send().await?;
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => {
                debug!(method, "Telegram call succeeded");
                Ok(result)
            }
            ApiResponse { description, .. } => {
                let description = description.unwrap_or_else(|| status.to_string());
                warn!(method, status = %status, description = %description, "Telegram API returned error");
                Err(BotError::Api {
                    method,
                    description,
                })
            }
        }
    }

    /// Point Telegram at our webhook
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let _: bool = self.call("setWebhook", &json!({ "url": url })).await?;
        Ok(())
    }
}

fn message_payload(chat_id: i64, reply: &Reply) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": reply.text,
        "parse_mode": "HTML",
        "disable_web_page_preview": true,
    });
    if let Some(keyboard) = &reply.keyboard {
        payload["reply_markup"] = json!(keyboard);
    }
    payload
}

#[derive(serde::Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<i64> {
        let sent: SentMessage = self
            .call("sendMessage", &message_payload(chat_id, reply))
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, reply: &Reply) -> Result<()> {
        let mut payload = message_payload(chat_id, reply);
        payload["message_id"] = json!(message_id);
        // Returns the edited Message, or `true` for inline messages
        let _: Value = self.call("editMessageText", &payload).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    async fn get_chat_member(&self, chat: &str, user_id: i64) -> Result<String> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                &json!({ "chat_id": chat, "user_id": user_id }),
            )
            .await?;
        Ok(member.status)
    }

    async fn get_me(&self) -> Result<TgUser> {
        self.call("getMe", &json!({})).await
    }
}
