//! The subset of Telegram Bot API objects the bot reads and writes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<TgUser>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl TgUser {
    /// `@username` when available, else the first name
    pub fn display_name(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| self.first_name.clone())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<Button>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Button {
    pub fn callback(text: &str, data: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            callback_data: Some(data.into()),
            url: None,
        }
    }

    pub fn link(text: &str, url: impl Into<String>) -> Self {
        Self {
            text: text.to_string(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

/// Text plus optional keyboard, always sent with HTML parse mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_update_deserializes() {
        let raw = r#"{
            "update_id": 10,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 42, "is_bot": false, "first_name": "Ann", "username": "ann"},
                "message": {"message_id": 7, "chat": {"id": 42, "type": "private"}, "date": 0},
                "data": "approve:3"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.from.id, 42);
        assert_eq!(query.data.as_deref(), Some("approve:3"));
        assert_eq!(query.message.unwrap().message_id, 7);
        assert!(update.message.is_none());
    }

    #[test]
    fn test_keyboard_omits_absent_fields() {
        let keyboard = InlineKeyboard {
            inline_keyboard: vec![vec![Button::callback("Go", "main_menu")]],
        };
        let json = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"inline_keyboard": [[{"text": "Go", "callback_data": "main_menu"}]]})
        );
    }

    #[test]
    fn test_error_envelope() {
        let raw = r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;
        let response: ApiResponse<ChatMember> = serde_json::from_str(raw).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(
            response.description.as_deref(),
            Some("Bad Request: chat not found")
        );
    }
}
