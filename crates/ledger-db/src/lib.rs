pub mod config;
pub mod models;
pub mod pool;
pub mod repositories;
pub mod store;

pub use config::DatabaseConfig;
pub use pool::DatabasePool;
pub use store::PgLedgerStore;

use ledger_core::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::Unavailable(err.to_string())
            }
            sqlx::Error::Tls(_) => DatabaseError::Connection(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::Serialization(err.to_string())
            }
            _ => DatabaseError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}

impl From<DatabaseError> for LedgerError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Connection(msg) | DatabaseError::Unavailable(msg) => {
                LedgerError::StorageUnavailable(msg)
            }
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_exhaustion_is_transient() {
        let err: LedgerError = DatabaseError::from(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_transient());

        let err: LedgerError = DatabaseError::from(sqlx::Error::RowNotFound).into();
        assert!(!err.is_transient());
    }
}
