use metrics::{describe_gauge, gauge};

/// Initialize gauge descriptions
pub fn init() {
    describe_gauge!("ledger_users", "Number of known users");
    describe_gauge!(
        "ledger_pending_withdrawals",
        "Number of withdrawal requests awaiting a decision"
    );
    describe_gauge!(
        "ledger_reject_sessions",
        "Operator reject sessions waiting for a reason"
    );
}

/// Set users gauge
pub fn set_users(count: i64) {
    gauge!("ledger_users").set(count as f64);
}

/// Set pending withdrawals gauge
pub fn set_pending_withdrawals(count: i64) {
    gauge!("ledger_pending_withdrawals").set(count as f64);
}

pub fn set_reject_sessions(count: usize) {
    gauge!("ledger_reject_sessions").set(count as f64);
}
