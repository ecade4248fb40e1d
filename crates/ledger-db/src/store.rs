use crate::models::DbUser;
use crate::pool::DatabasePool;
use crate::repositories::{UserRepository, WithdrawalRepository};
use crate::DatabaseError;
use async_trait::async_trait;
use ledger_core::{
    parse_amount, LedgerError, LedgerStats, LedgerStore, NewUser, Result, User, UserField,
    UserId, UserMutation, WithdrawalCheck, WithdrawalId, WithdrawalOutcome, WithdrawalRequest,
    WithdrawalStatus,
};
use tracing::debug;

/// PostgreSQL ledger store.
///
/// Each mutation runs in one transaction. Rows are locked with
/// `SELECT ... FOR UPDATE`, withdrawal before user when both are needed.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: DatabasePool,
}

impl PgLedgerStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        UserRepository::get_by_id(self.pool.inner(), id)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn upsert_user(&self, id: UserId, defaults: &NewUser) -> Result<bool> {
        let created = UserRepository::insert_if_not_exists(self.pool.inner(), id, defaults).await?;
        if created {
            debug!(user_id = id, "User created");
        }
        Ok(created)
    }

    async fn update_user_field(&self, id: UserId, field: UserField) -> Result<User> {
        let row = UserRepository::update_field(self.pool.inner(), id, &field)
            .await?
            .ok_or(LedgerError::UserNotFound(id))?;
        User::try_from(row)
    }

    async fn modify_user(&self, id: UserId, mutation: &UserMutation<'_>) -> Result<User> {
        let mut tx = self.pool.inner().begin().await.map_err(DatabaseError::from)?;

        let row = UserRepository::lock_by_id(&mut *tx, id)
            .await?
            .ok_or(LedgerError::UserNotFound(id))?;
        let mut user = User::try_from(row)?;
        // An error here drops the transaction, which rolls it back
        mutation(&mut user)?;

        UserRepository::save(&mut *tx, &DbUser::from(&user)).await?;
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(user)
    }

    async fn open_withdrawal(
        &self,
        user_id: UserId,
        check: &WithdrawalCheck<'_>,
    ) -> Result<WithdrawalRequest> {
        let mut tx = self.pool.inner().begin().await.map_err(DatabaseError::from)?;

        let row = UserRepository::lock_by_id(&mut *tx, user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;
        let mut user = User::try_from(row)?;
        let (amount, address) = check(&user)?;
        user.reserve(amount)?;

        UserRepository::save(&mut *tx, &DbUser::from(&user)).await?;
        let request =
            WithdrawalRepository::insert(&mut *tx, user_id, &amount.to_string(), &address).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        WithdrawalRequest::try_from(request)
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        WithdrawalRepository::get_by_id(self.pool.inner(), id)
            .await?
            .map(WithdrawalRequest::try_from)
            .transpose()
    }

    async fn settle_withdrawal(
        &self,
        id: WithdrawalId,
        outcome: &WithdrawalOutcome,
    ) -> Result<(WithdrawalRequest, User)> {
        let mut tx = self.pool.inner().begin().await.map_err(DatabaseError::from)?;

        let row = WithdrawalRepository::lock_by_id(&mut *tx, id)
            .await?
            .ok_or(LedgerError::NotFound(id))?;
        let mut request = WithdrawalRequest::try_from(row)?;
        request.transition(outcome)?;

        let user_row = UserRepository::lock_by_id(&mut *tx, request.user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(request.user_id))?;
        let mut user = User::try_from(user_row)?;
        match outcome {
            WithdrawalOutcome::Approved => user.consume(request.amount)?,
            WithdrawalOutcome::Rejected { .. } => user.release(request.amount)?,
        }

        let finished = WithdrawalRepository::finish_pending(
            &mut *tx,
            id,
            request.status.as_str(),
            request.rejection_reason.as_deref(),
        )
        .await?
        .ok_or(LedgerError::AlreadyTerminal(WithdrawalStatus::Pending))?;
        UserRepository::save(&mut *tx, &DbUser::from(&user)).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        Ok((WithdrawalRequest::try_from(finished)?, user))
    }

    async fn list_pending_withdrawals(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        WithdrawalRepository::get_pending(self.pool.inner(), limit)
            .await?
            .into_iter()
            .map(WithdrawalRequest::try_from)
            .collect()
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let (total_users, total_referrals) = UserRepository::totals(self.pool.inner()).await?;
        let (pending_count, pending_amount) =
            WithdrawalRepository::pending_totals(self.pool.inner()).await?;
        Ok(LedgerStats {
            total_users,
            total_referrals,
            pending_count,
            pending_amount: parse_amount(&pending_amount)?,
        })
    }
}
