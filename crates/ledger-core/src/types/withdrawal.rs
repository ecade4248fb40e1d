use crate::error::LedgerError;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Auto-incrementing withdrawal identifier
pub type WithdrawalId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(LedgerError::Storage(format!(
                "unknown withdrawal status: {}",
                other
            ))),
        }
    }
}

/// One withdrawal attempt. Amount and address are snapshots taken at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub address: String,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

/// Terminal transition applied by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    Approved,
    Rejected { reason: String },
}

impl WithdrawalOutcome {
    pub fn status(&self) -> WithdrawalStatus {
        match self {
            WithdrawalOutcome::Approved => WithdrawalStatus::Approved,
            WithdrawalOutcome::Rejected { .. } => WithdrawalStatus::Rejected,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            WithdrawalOutcome::Approved => None,
            WithdrawalOutcome::Rejected { reason } => Some(reason),
        }
    }
}

impl WithdrawalRequest {
    /// Apply a terminal transition. Anything but `pending` is a conflict.
    pub fn transition(&mut self, outcome: &WithdrawalOutcome) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::AlreadyTerminal(self.status));
        }
        self.status = outcome.status();
        self.rejection_reason = outcome.reason().map(str::to_string);
        Ok(())
    }
}
