use chrono::{DateTime, Utc};
use ledger_core::{parse_amount, LedgerError, WithdrawalRequest};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for withdrawals table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWithdrawal {
    pub id: i64,
    pub user_id: i64,
    /// Exact decimal text snapshot of the balance at request time
    pub amount: String,
    pub address: String,
    /// pending | approved | rejected
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
}

impl TryFrom<DbWithdrawal> for WithdrawalRequest {
    type Error = LedgerError;

    fn try_from(row: DbWithdrawal) -> Result<Self, Self::Error> {
        Ok(WithdrawalRequest {
            id: row.id,
            user_id: row.user_id,
            amount: parse_amount(&row.amount)?,
            address: row.address,
            status: row.status.parse()?,
            created_at: row.created_at,
            rejection_reason: row.rejection_reason,
        })
    }
}
