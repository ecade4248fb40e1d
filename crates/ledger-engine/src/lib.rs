pub mod clock;
pub mod ledger;
pub mod ports;
pub mod retry;
pub mod sessions;
pub mod workflow;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{AccountSummary, BalanceLedger, BonusGrant, Onboarding};
pub use ports::{MembershipCheck, MembershipStatus, Notice, Notifier, PortError};
pub use retry::RetryingStore;
pub use sessions::{RejectSession, RejectSessions};
pub use workflow::{Dashboard, WithdrawalWorkflow};

use ledger_core::{AppConfig, LedgerError, LedgerStore, UserId};
use std::sync::Arc;
use tracing::debug;

/// Both halves of the engine, sharing one store, notifier and clock
pub struct Engine {
    pub ledger: BalanceLedger,
    pub workflow: WithdrawalWorkflow,
}

impl Engine {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn LedgerStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ttl_secs = config.reject_session_ttl_secs.min(u32::MAX as u64) as i64;
        let ttl = chrono::Duration::seconds(ttl_secs);
        Self {
            ledger: BalanceLedger::new(
                store.clone(),
                notifier.clone(),
                clock.clone(),
                config.bonus.clone(),
                config.operator_id,
            ),
            workflow: WithdrawalWorkflow::new(
                store,
                notifier,
                clock,
                RejectSessions::new(ttl),
                config.operator_id,
                config.bonus.min_withdrawal,
            ),
        }
    }
}

/// Log and count a business-rule refusal. Storage failures pass through untouched.
pub(crate) fn record_refusal(actor: UserId, err: LedgerError) -> LedgerError {
    if !matches!(
        err,
        LedgerError::StorageUnavailable(_) | LedgerError::Storage(_) | LedgerError::Invariant(_)
    ) {
        ledger_metrics::counters::refusal(err.kind());
        debug!(actor, kind = err.kind(), reason = %err, "Refused");
    }
    err
}
