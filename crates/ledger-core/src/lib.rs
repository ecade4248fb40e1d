pub mod address;
pub mod amount;
pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use address::{checksum_available, validate_address};
pub use amount::{format_bnb, parse_amount};
pub use config::{AppConfig, BonusConfig, StorageConfig, TelegramConfig};
pub use error::{LedgerError, Result};
pub use store::{LedgerStore, UserMutation, WithdrawalCheck};
pub use types::{
    LedgerStats, NewUser, User, UserField, UserId, WithdrawalId, WithdrawalOutcome,
    WithdrawalRequest, WithdrawalStatus,
};
