use crate::types::{UserId, WithdrawalId, WithdrawalStatus};
use chrono::Duration;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("User has not completed channel and subscription verification")]
    NotVerified,

    #[error("Daily bonus already claimed, next claim in {}", format_remaining(.remaining))]
    CooldownActive { remaining: Duration },

    #[error("Balance {balance} is below the minimum withdrawal of {minimum}")]
    BelowMinimum { balance: Decimal, minimum: Decimal },

    #[error("No payout address set")]
    NoPayoutAddress,

    #[error("Invalid payout address format")]
    InvalidAddressFormat,

    #[error("Actor is not authorized for this operation")]
    Unauthorized,

    #[error("Withdrawal not found: {0}")]
    NotFound(WithdrawalId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Withdrawal already {0}")]
    AlreadyTerminal(WithdrawalStatus),

    #[error("Rejection reason must not be empty")]
    EmptyReason,

    #[error("Reject session for withdrawal {withdrawal_id} expired")]
    RejectSessionExpired { withdrawal_id: WithdrawalId },

    #[error("Ledger invariant violated: {0}")]
    Invariant(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LedgerError {
    /// Only transient storage failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::StorageUnavailable(_))
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotVerified => "not_verified",
            LedgerError::CooldownActive { .. } => "cooldown_active",
            LedgerError::BelowMinimum { .. } => "below_minimum",
            LedgerError::NoPayoutAddress => "no_payout_address",
            LedgerError::InvalidAddressFormat => "invalid_address_format",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::UserNotFound(_) => "user_not_found",
            LedgerError::AlreadyTerminal(_) => "already_terminal",
            LedgerError::EmptyReason => "empty_reason",
            LedgerError::RejectSessionExpired { .. } => "reject_session_expired",
            LedgerError::Invariant(_) => "invariant",
            LedgerError::StorageUnavailable(_) => "storage_unavailable",
            LedgerError::Storage(_) => "storage",
            LedgerError::MissingEnvVar(_) => "missing_env_var",
            LedgerError::InvalidConfig(_) => "invalid_config",
        }
    }
}

/// Whole hours and leftover minutes of a cooldown, clamped at zero.
pub fn hours_minutes(remaining: &Duration) -> (i64, i64) {
    let secs = remaining.num_seconds().max(0);
    (secs / 3600, (secs % 3600) / 60)
}

fn format_remaining(remaining: &Duration) -> String {
    let (hours, minutes) = hours_minutes(remaining);
    format!("{}h {}m", hours, minutes)
}

pub type Result<T> = std::result::Result<T, LedgerError>;
