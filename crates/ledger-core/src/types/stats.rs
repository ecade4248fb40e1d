use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate figures for the operator dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_users: i64,
    pub total_referrals: i64,
    pub pending_count: i64,
    pub pending_amount: Decimal,
}
