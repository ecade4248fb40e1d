use crate::repositories::WithdrawalRepository;
use crate::{config::DatabaseConfig, DatabaseError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Shared pool for the ledger tables
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let target = redact_url(&config.url);
        info!(
            database = %target,
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            acquire_timeout_secs = config.connect_timeout_secs,
            "Connecting to ledger database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DatabaseError::Connection(format!("{}: {}", target, e)))?;

        Ok(Self { pool })
    }

    /// Apply the ledger schema, then report how much work is already waiting
    /// for the operator.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./src/migrations").run(&self.pool).await?;
        let (pending, amount) = WithdrawalRepository::pending_totals(&self.pool).await?;
        info!(pending, amount = %amount, "Ledger schema ready");
        Ok(())
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        info!("Closing ledger database pool");
        self.pool.close().await;
    }
}

/// Connection URL with any password masked, for logs and error messages
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}
