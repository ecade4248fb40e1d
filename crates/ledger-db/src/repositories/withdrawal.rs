use crate::models::DbWithdrawal;
use crate::Result;
use sqlx::PgExecutor;

pub struct WithdrawalRepository;

impl WithdrawalRepository {
    /// Insert a pending request; the id comes from the BIGSERIAL sequence
    pub async fn insert<'e, E>(
        executor: E,
        user_id: i64,
        amount: &str,
        address: &str,
    ) -> Result<DbWithdrawal>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, DbWithdrawal>(
            r#"
            INSERT INTO withdrawals (user_id, amount, address, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(address)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<DbWithdrawal>>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query_as::<_, DbWithdrawal>("SELECT * FROM withdrawals WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(result)
    }

    pub async fn lock_by_id<'e, E>(executor: E, id: i64) -> Result<Option<DbWithdrawal>>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query_as::<_, DbWithdrawal>(
            "SELECT * FROM withdrawals WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(result)
    }

    /// Compare-and-swap out of `pending`. Returns `None` when the row is missing
    /// or already terminal.
    pub async fn finish_pending<'e, E>(
        executor: E,
        id: i64,
        status: &str,
        reason: Option<&str>,
    ) -> Result<Option<DbWithdrawal>>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query_as::<_, DbWithdrawal>(
            r#"
            UPDATE withdrawals
            SET status = $2, rejection_reason = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .fetch_optional(executor)
        .await?;
        Ok(result)
    }

    /// Pending requests, oldest first
    pub async fn get_pending<'e, E>(executor: E, limit: i64) -> Result<Vec<DbWithdrawal>>
    where
        E: PgExecutor<'e>,
    {
        let results = sqlx::query_as::<_, DbWithdrawal>(
            r#"
            SELECT * FROM withdrawals
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(results)
    }

    /// Count of pending requests and their exact total as decimal text
    pub async fn pending_totals<'e, E>(executor: E) -> Result<(i64, String)>
    where
        E: PgExecutor<'e>,
    {
        let totals: (i64, String) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount::NUMERIC), 0)::TEXT
            FROM withdrawals
            WHERE status = 'pending'
            "#,
        )
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }
}
