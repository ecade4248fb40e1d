use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ledger_core::{
    LedgerError, LedgerStats, LedgerStore, NewUser, Result, User, UserField, UserId,
    UserMutation, WithdrawalCheck, WithdrawalId, WithdrawalOutcome, WithdrawalRequest,
    WithdrawalStatus,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Thread-safe, process-local ledger store.
///
/// Each row sits behind its DashMap shard lock, so a read-modify-write on one
/// user or withdrawal excludes every other writer of that row. When both a
/// withdrawal and its user are locked, the withdrawal is always taken first.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    withdrawals: DashMap<WithdrawalId, WithdrawalRequest>,
    next_withdrawal_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            withdrawals: DashMap::new(),
            next_withdrawal_id: AtomicI64::new(1),
        }
    }

    fn insert_pending(&self, user_id: UserId, amount: Decimal, address: &str) -> WithdrawalRequest {
        let id = self.next_withdrawal_id.fetch_add(1, Ordering::SeqCst);
        let request = WithdrawalRequest {
            id,
            user_id,
            amount,
            address: address.to_string(),
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            rejection_reason: None,
        };
        self.withdrawals.insert(id, request.clone());
        request
    }

    /// Number of user rows
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn upsert_user(&self, id: UserId, defaults: &NewUser) -> Result<bool> {
        match self.users.entry(id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(User::new(id, defaults));
                debug!(user_id = id, "User created");
                Ok(true)
            }
        }
    }

    async fn update_user_field(&self, id: UserId, field: UserField) -> Result<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or(LedgerError::UserNotFound(id))?;
        user.apply_field(field);
        Ok(user.clone())
    }

    async fn modify_user(&self, id: UserId, mutation: &UserMutation<'_>) -> Result<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or(LedgerError::UserNotFound(id))?;
        let mut draft = user.clone();
        mutation(&mut draft)?;
        *user = draft;
        Ok(user.clone())
    }

    async fn open_withdrawal(
        &self,
        user_id: UserId,
        check: &WithdrawalCheck<'_>,
    ) -> Result<WithdrawalRequest> {
        let (amount, address) = {
            let mut user = self
                .users
                .get_mut(&user_id)
                .ok_or(LedgerError::UserNotFound(user_id))?;
            let (amount, address) = check(user.value())?;
            let mut draft = user.clone();
            draft.reserve(amount)?;
            *user = draft;
            (amount, address)
        };
        // User guard is released before touching the withdrawals map
        Ok(self.insert_pending(user_id, amount, &address))
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        Ok(self.withdrawals.get(&id).map(|w| w.clone()))
    }

    async fn settle_withdrawal(
        &self,
        id: WithdrawalId,
        outcome: &WithdrawalOutcome,
    ) -> Result<(WithdrawalRequest, User)> {
        let mut request = self
            .withdrawals
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        let mut settled = request.clone();
        settled.transition(outcome)?;

        let mut user = self
            .users
            .get_mut(&settled.user_id)
            .ok_or(LedgerError::UserNotFound(settled.user_id))?;
        let mut draft = user.clone();
        match outcome {
            WithdrawalOutcome::Approved => draft.consume(settled.amount)?,
            WithdrawalOutcome::Rejected { .. } => draft.release(settled.amount)?,
        }

        *user = draft;
        *request = settled;
        Ok((request.clone(), user.clone()))
    }

    async fn list_pending_withdrawals(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        let mut pending: Vec<WithdrawalRequest> = self
            .withdrawals
            .iter()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .map(|w| w.clone())
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending.truncate(limit);
        Ok(pending)
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let mut stats = LedgerStats {
            total_users: self.users.len() as i64,
            ..Default::default()
        };
        for user in self.users.iter() {
            stats.total_referrals += user.referral_count;
        }
        for request in self.withdrawals.iter() {
            if request.status == WithdrawalStatus::Pending {
                stats.pending_count += 1;
                stats.pending_amount += request.amount;
            }
        }
        Ok(stats)
    }
}
