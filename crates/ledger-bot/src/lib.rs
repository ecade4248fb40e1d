//! Telegram front-end for the incentive ledger.

pub mod api;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod keyboards;
pub mod messenger;
pub mod notifier;
pub mod render;
pub mod server;
pub mod types;

#[cfg(test)]
mod fake;

pub use api::{ChatApi, TelegramClient};
pub use config::BotServerConfig;
pub use dispatcher::Dispatcher;
pub use error::{BotError, Result};
pub use messenger::Messenger;
pub use notifier::{ChannelMembership, TelegramNotifier};
pub use server::WebhookServer;
