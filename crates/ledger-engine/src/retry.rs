use async_trait::async_trait;
use ledger_core::{
    LedgerError, LedgerStats, LedgerStore, NewUser, Result, StorageConfig, User, UserField,
    UserId, UserMutation, WithdrawalCheck, WithdrawalId, WithdrawalOutcome, WithdrawalRequest,
};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

const MAX_DELAY: Duration = Duration::from_secs(5);

/// Bounds every call on the wrapped store with a timeout and retries
/// `StorageUnavailable` with exponential backoff. Business errors pass straight
/// through.
pub struct RetryingStore<S> {
    inner: S,
    timeout: Duration,
    max_attempts: u32,
    base_delay: Duration,
}

impl<S: LedgerStore> RetryingStore<S> {
    pub fn new(inner: S, config: &StorageConfig) -> Self {
        Self {
            inner,
            timeout: config.timeout(),
            max_attempts: config.retry_attempts.max(1),
            base_delay: config.retry_delay(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0u32;
        let mut delay = self.base_delay;

        loop {
            attempts += 1;

            let result = match tokio::time::timeout(self.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(LedgerError::StorageUnavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.timeout.as_millis()
                ))),
            };

            match result {
                Ok(value) => {
                    if attempts > 1 {
                        info!(operation, attempts, "Storage call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempts < self.max_attempts => {
                    ledger_metrics::counters::storage_retry(operation);
                    warn!(
                        operation,
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Storage call failed, retrying with backoff"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(operation, attempts, error = %e, "Storage call failed after max retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl<S: LedgerStore> LedgerStore for RetryingStore<S> {
    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.call("get_user", move || self.inner.get_user(id)).await
    }

    async fn upsert_user(&self, id: UserId, defaults: &NewUser) -> Result<bool> {
        self.call("upsert_user", move || self.inner.upsert_user(id, defaults))
            .await
    }

    async fn update_user_field(&self, id: UserId, field: UserField) -> Result<User> {
        let field = &field;
        self.call("update_user_field", move || {
            self.inner.update_user_field(id, field.clone())
        })
        .await
    }

    async fn modify_user(&self, id: UserId, mutation: &UserMutation<'_>) -> Result<User> {
        self.call("modify_user", move || self.inner.modify_user(id, mutation))
            .await
    }

    async fn open_withdrawal(
        &self,
        user_id: UserId,
        check: &WithdrawalCheck<'_>,
    ) -> Result<WithdrawalRequest> {
        self.call("open_withdrawal", move || {
            self.inner.open_withdrawal(user_id, check)
        })
        .await
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        self.call("get_withdrawal", move || self.inner.get_withdrawal(id))
            .await
    }

    async fn settle_withdrawal(
        &self,
        id: WithdrawalId,
        outcome: &WithdrawalOutcome,
    ) -> Result<(WithdrawalRequest, User)> {
        self.call("settle_withdrawal", move || {
            self.inner.settle_withdrawal(id, outcome)
        })
        .await
    }

    async fn list_pending_withdrawals(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        self.call("list_pending_withdrawals", move || {
            self.inner.list_pending_withdrawals(limit)
        })
        .await
    }

    async fn stats(&self) -> Result<LedgerStats> {
        self.call("stats", move || self.inner.stats()).await
    }
}
