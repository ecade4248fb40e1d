use chrono::{DateTime, Utc};
use ledger_core::{parse_amount, LedgerError, User};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbUser {
    /// Platform identity (primary key)
    pub id: i64,
    pub display_name: Option<String>,
    /// Exact decimal text
    pub balance: String,
    /// Exact decimal text, held by pending withdrawals
    pub reserved: String,
    pub referral_count: i64,
    pub referred_by: Option<i64>,
    pub payout_address: Option<String>,
    pub last_bonus_at: Option<DateTime<Utc>>,
    pub joined_channel: bool,
    pub confirmed_subscription: bool,
}

impl TryFrom<DbUser> for User {
    type Error = LedgerError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            display_name: row.display_name,
            balance: parse_amount(&row.balance)?,
            reserved: parse_amount(&row.reserved)?,
            referral_count: row.referral_count,
            referred_by: row.referred_by,
            payout_address: row.payout_address,
            last_bonus_at: row.last_bonus_at,
            joined_channel: row.joined_channel,
            confirmed_subscription: row.confirmed_subscription,
        })
    }
}

impl From<&User> for DbUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            balance: user.balance.to_string(),
            reserved: user.reserved.to_string(),
            referral_count: user.referral_count,
            referred_by: user.referred_by,
            payout_address: user.payout_address.clone(),
            last_bonus_at: user.last_bonus_at,
            joined_channel: user.joined_channel,
            confirmed_subscription: user.confirmed_subscription,
        }
    }
}
