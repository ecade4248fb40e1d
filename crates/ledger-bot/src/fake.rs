//! In-process stand-in for the Bot API used by the tests.

use crate::api::ChatApi;
use crate::error::{BotError, Result};
use crate::types::{Reply, TgUser};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Sent {
        chat_id: i64,
        message_id: i64,
        reply: Reply,
    },
    Edited {
        chat_id: i64,
        message_id: i64,
        reply: Reply,
    },
    Deleted {
        chat_id: i64,
        message_id: i64,
    },
    Answered(String),
}

pub struct FakeChat {
    events: Mutex<Vec<ChatEvent>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    member_status: Mutex<Option<String>>,
    lookups: Mutex<Vec<(String, i64)>>,
}

impl Default for FakeChat {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
            failing: AtomicBool::new(false),
            member_status: Mutex::new(Some("member".to_string())),
            lookups: Mutex::new(Vec::new()),
        }
    }
}

impl FakeChat {
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// `None` makes the lookup fail
    pub fn set_member_status(&self, status: impl Into<Option<&'static str>>) {
        *self.member_status.lock() = status.into().map(str::to_string);
    }

    pub fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().clone()
    }

    pub fn texts_to(&self, chat: i64) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Sent { chat_id, reply, .. } if *chat_id == chat => {
                    Some(reply.text.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn last_sent(&self, chat: i64) -> Option<Reply> {
        self.events.lock().iter().rev().find_map(|e| match e {
            ChatEvent::Sent { chat_id, reply, .. } if *chat_id == chat => Some(reply.clone()),
            _ => None,
        })
    }

    pub fn edits(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Edited { reply, .. } => Some(reply.text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self, chat: i64) -> Vec<i64> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Deleted {
                    chat_id,
                    message_id,
                } if *chat_id == chat => Some(*message_id),
                _ => None,
            })
            .collect()
    }

    pub fn member_lookups(&self) -> Vec<(String, i64)> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send_message(&self, chat_id: i64, reply: &Reply) -> Result<i64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BotError::Api {
                method: "sendMessage",
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(ChatEvent::Sent {
            chat_id,
            message_id,
            reply: reply.clone(),
        });
        Ok(message_id)
    }

    async fn edit_message_text(&self, chat_id: i64, message_id: i64, reply: &Reply) -> Result<()> {
        self.events.lock().push(ChatEvent::Edited {
            chat_id,
            message_id,
            reply: reply.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.events.lock().push(ChatEvent::Deleted {
            chat_id,
            message_id,
        });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_id: &str) -> Result<()> {
        self.events
            .lock()
            .push(ChatEvent::Answered(callback_id.to_string()));
        Ok(())
    }

    async fn get_chat_member(&self, chat: &str, user_id: i64) -> Result<String> {
        self.lookups.lock().push((chat.to_string(), user_id));
        self.member_status.lock().clone().ok_or_else(|| BotError::Api {
            method: "getChatMember",
            description: "Bad Request: member list is inaccessible".to_string(),
        })
    }

    async fn get_me(&self) -> Result<TgUser> {
        Ok(TgUser {
            id: 1,
            username: Some("EarnerBot".to_string()),
            first_name: Some("Earner".to_string()),
        })
    }
}
