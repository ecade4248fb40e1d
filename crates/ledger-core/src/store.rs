//! Storage seam shared by the in-memory and PostgreSQL ledgers.

use crate::error::Result;
use crate::types::{
    LedgerStats, NewUser, User, UserField, UserId, WithdrawalId, WithdrawalOutcome,
    WithdrawalRequest,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Read-modify-write step run against a locked user row. Returning an error
/// aborts the write. May be invoked more than once when a store retries.
pub type UserMutation<'a> = dyn Fn(&mut User) -> Result<()> + Send + Sync + 'a;

/// Precondition check for a new withdrawal, run against the locked user row.
/// Returns the `(amount, address)` snapshot to hold and record.
pub type WithdrawalCheck<'a> = dyn Fn(&User) -> Result<(Decimal, String)> + Send + Sync + 'a;

/// Durable keyed storage for users and withdrawal requests.
///
/// Every mutating call is atomic with respect to the rows it touches: concurrent
/// callers on the same user or withdrawal id are serialized, never interleaved.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Create the row if absent; never touches an existing row.
    /// Returns `true` when a row was created.
    async fn upsert_user(&self, id: UserId, defaults: &NewUser) -> Result<bool>;

    /// Idempotent point update of a non-monetary field
    async fn update_user_field(&self, id: UserId, field: UserField) -> Result<User>;

    /// Atomic read-modify-write of one user row
    async fn modify_user(&self, id: UserId, mutation: &UserMutation<'_>) -> Result<User>;

    /// Check preconditions, hold the snapshot amount and insert the pending
    /// request with a fresh, monotonically increasing id. The user row stays
    /// locked throughout.
    async fn open_withdrawal(
        &self,
        user_id: UserId,
        check: &WithdrawalCheck<'_>,
    ) -> Result<WithdrawalRequest>;

    /// Open a pending request for a fixed amount. The amount is held like any
    /// other request and must fit the user's available balance.
    async fn create_withdrawal(
        &self,
        user_id: UserId,
        amount: Decimal,
        address: &str,
    ) -> Result<WithdrawalId> {
        let snapshot = move |_: &User| -> Result<(Decimal, String)> {
            Ok((amount, address.to_string()))
        };
        Ok(self.open_withdrawal(user_id, &snapshot).await?.id)
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>>;

    /// Terminal transition plus hold settlement in one step: approval debits the
    /// snapshot amount, rejection releases it. Fails with `AlreadyTerminal`
    /// unless the request is still pending, so a hold is settled exactly once.
    async fn settle_withdrawal(
        &self,
        id: WithdrawalId,
        outcome: &WithdrawalOutcome,
    ) -> Result<(WithdrawalRequest, User)>;

    /// Transition from `pending` and settle its hold, returning the request only.
    /// Fails with `AlreadyTerminal` otherwise.
    async fn set_withdrawal_status(
        &self,
        id: WithdrawalId,
        outcome: &WithdrawalOutcome,
    ) -> Result<WithdrawalRequest> {
        Ok(self.settle_withdrawal(id, outcome).await?.0)
    }

    /// Pending requests, oldest first
    async fn list_pending_withdrawals(&self, limit: usize) -> Result<Vec<WithdrawalRequest>>;

    async fn stats(&self) -> Result<LedgerStats>;
}
