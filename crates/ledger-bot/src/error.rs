use ledger_core::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Telegram API error in {method}: {description}")]
    Api {
        method: &'static str,
        description: String,
    },

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
