use crate::models::DbUser;
use crate::Result;
use ledger_core::{NewUser, UserField};
use sqlx::PgExecutor;

pub struct UserRepository;

impl UserRepository {
    /// Insert or ignore user (upsert without update)
    pub async fn insert_if_not_exists<'e, E>(executor: E, id: i64, defaults: &NewUser) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, display_name, referred_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&defaults.display_name)
        .bind(defaults.referred_by)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get user by id
    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<DbUser>>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(result)
    }

    /// Get user by id and hold its row lock until the transaction ends
    pub async fn lock_by_id<'e, E>(executor: E, id: i64) -> Result<Option<DbUser>>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(result)
    }

    /// Write back every mutable column of a locked row
    pub async fn save<'e, E>(executor: E, user: &DbUser) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            UPDATE users SET
                display_name = $2,
                balance = $3,
                reserved = $4,
                referral_count = $5,
                payout_address = $6,
                last_bonus_at = $7,
                joined_channel = $8,
                confirmed_subscription = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.balance)
        .bind(&user.reserved)
        .bind(user.referral_count)
        .bind(&user.payout_address)
        .bind(user.last_bonus_at)
        .bind(user.joined_channel)
        .bind(user.confirmed_subscription)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Point update of a non-monetary column
    pub async fn update_field<'e, E>(executor: E, id: i64, field: &UserField) -> Result<Option<DbUser>>
    where
        E: PgExecutor<'e>,
    {
        let query = match field {
            UserField::DisplayName(name) => {
                sqlx::query_as::<_, DbUser>(
                    "UPDATE users SET display_name = $2 WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(name.clone())
            }
            UserField::PayoutAddress(address) => {
                sqlx::query_as::<_, DbUser>(
                    "UPDATE users SET payout_address = $2 WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(address.clone())
            }
            UserField::JoinedChannel(joined) => {
                sqlx::query_as::<_, DbUser>(
                    "UPDATE users SET joined_channel = $2 WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(*joined)
            }
            UserField::ConfirmedSubscription(confirmed) => {
                sqlx::query_as::<_, DbUser>(
                    "UPDATE users SET confirmed_subscription = $2 WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(*confirmed)
            }
        };
        Ok(query.fetch_optional(executor).await?)
    }

    /// Count users and sum their referral counts
    pub async fn totals<'e, E>(executor: E) -> Result<(i64, i64)>
    where
        E: PgExecutor<'e>,
    {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(referral_count), 0)::BIGINT FROM users",
        )
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }
}
