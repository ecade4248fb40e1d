use metrics::{counter, describe_counter};

/// Initialize counter descriptions
pub fn init() {
    describe_counter!(
        "ledger_bonus_claims_total",
        "Daily bonuses granted"
    );
    describe_counter!(
        "ledger_referral_credits_total",
        "Referral credits applied"
    );
    describe_counter!(
        "ledger_withdrawals_total",
        "Withdrawal requests by outcome (requested, approved, rejected)"
    );
    describe_counter!(
        "ledger_refusals_total",
        "Business rule refusals by error kind"
    );
    describe_counter!(
        "ledger_notification_failures_total",
        "Notifications that could not be delivered"
    );
    describe_counter!(
        "ledger_storage_retries_total",
        "Storage calls retried after a transient failure"
    );
    describe_counter!(
        "ledger_updates_total",
        "Inbound chat updates by kind"
    );
}

/// Increment bonus claims counter
pub fn bonus_claimed() {
    counter!("ledger_bonus_claims_total").increment(1);
}

/// Increment referral credits counter
pub fn referral_credited() {
    counter!("ledger_referral_credits_total").increment(1);
}

pub fn withdrawal_requested() {
    counter!("ledger_withdrawals_total", "outcome" => "requested").increment(1);
}

pub fn withdrawal_approved() {
    counter!("ledger_withdrawals_total", "outcome" => "approved").increment(1);
}

pub fn withdrawal_rejected() {
    counter!("ledger_withdrawals_total", "outcome" => "rejected").increment(1);
}

/// Increment refusals counter for one error kind
pub fn refusal(kind: &'static str) {
    counter!("ledger_refusals_total", "kind" => kind).increment(1);
}

pub fn notification_failed() {
    counter!("ledger_notification_failures_total").increment(1);
}

/// Increment storage retries counter
pub fn storage_retry(operation: &'static str) {
    counter!("ledger_storage_retries_total", "operation" => operation).increment(1);
}

pub fn update_received(kind: &'static str) {
    counter!("ledger_updates_total", "kind" => kind).increment(1);
}
