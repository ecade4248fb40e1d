//! Collaborators the engine calls but does not implement.

use async_trait::async_trait;
use ledger_core::{UserId, WithdrawalId, WithdrawalRequest};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Collaborator unavailable: {0}")]
pub struct PortError(pub String);

/// Message intents emitted after a ledger mutation commits
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// To the referrer
    ReferralCredited { amount: Decimal },
    /// To the operator
    NewUser {
        user_id: UserId,
        display_name: Option<String>,
    },
    /// To the operator, with enough context for fraud triage
    WithdrawalRequested {
        request: WithdrawalRequest,
        display_name: Option<String>,
        referral_count: i64,
    },
    /// To the requesting user
    WithdrawalApproved {
        withdrawal_id: WithdrawalId,
        amount: Decimal,
    },
    /// To the requesting user; `reason` is exactly what the operator typed
    WithdrawalRejected {
        withdrawal_id: WithdrawalId,
        reason: String,
    },
}

impl Notice {
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::ReferralCredited { .. } => "referral_credited",
            Notice::NewUser { .. } => "new_user",
            Notice::WithdrawalRequested { .. } => "withdrawal_requested",
            Notice::WithdrawalApproved { .. } => "withdrawal_approved",
            Notice::WithdrawalRejected { .. } => "withdrawal_rejected",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, to: UserId, notice: &Notice) -> Result<(), PortError>;
}

/// Channel membership as reported by the messaging platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MembershipStatus {
    /// Parse the platform's status string; unknown values count as not joined
    pub fn from_api(status: &str) -> Self {
        match status {
            "creator" => MembershipStatus::Creator,
            "administrator" => MembershipStatus::Administrator,
            "member" => MembershipStatus::Member,
            "restricted" => MembershipStatus::Restricted,
            "kicked" => MembershipStatus::Kicked,
            _ => MembershipStatus::Left,
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Creator | MembershipStatus::Administrator | MembershipStatus::Member
        )
    }
}

#[async_trait]
pub trait MembershipCheck: Send + Sync {
    async fn membership(&self, user_id: UserId) -> Result<MembershipStatus, PortError>;
}

/// Fire-and-forget delivery. A failed send is logged and counted, never returned.
pub(crate) async fn deliver(notifier: &dyn Notifier, to: UserId, notice: Notice) {
    match notifier.notify(to, &notice).await {
        Ok(()) => debug!(to = to, kind = notice.kind(), "Notification sent"),
        Err(e) => {
            ledger_metrics::counters::notification_failed();
            warn!(
                to = to,
                kind = notice.kind(),
                error = %e,
                "Notification failed after commit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_statuses() {
        assert!(MembershipStatus::from_api("member").is_member());
        assert!(MembershipStatus::from_api("administrator").is_member());
        assert!(MembershipStatus::from_api("creator").is_member());
        assert!(!MembershipStatus::from_api("left").is_member());
        assert!(!MembershipStatus::from_api("restricted").is_member());
        assert!(!MembershipStatus::from_api("something_new").is_member());
    }
}
