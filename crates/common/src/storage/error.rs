//! Storage error types
//!
//! Errors raised by the SQLCipher pool and connection wrappers. Repository
//! code in `credstore-infra` converts these into domain errors.

use thiserror::Error;

use crate::error::{CommonError, ErrorClassification, ErrorSeverity};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(String),

    #[error("Database encryption error: {0}")]
    Encryption(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Wrong encryption key or database not encrypted")]
    WrongKeyOrNotEncrypted,

    #[error("Database pool exhausted")]
    PoolExhausted,

    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    R2d2(#[from] r2d2::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl ErrorClassification for StorageError {
    /// Pool exhaustion, timeouts and SQLite BUSY/LOCKED are transient.
    fn is_retryable(&self) -> bool {
        match self {
            Self::PoolExhausted | Self::Timeout(_) | Self::Connection(_) => true,
            Self::Rusqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
            ),
            Self::Common(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Encryption(_) | Self::Migration(_) | Self::WrongKeyOrNotEncrypted => {
                ErrorSeverity::Critical
            }
            Self::PoolExhausted | Self::Timeout(_) => ErrorSeverity::Warning,
            Self::Common(err) => err.severity(),
            Self::Connection(_)
            | Self::Query(_)
            | Self::InvalidConfig(_)
            | Self::Rusqlite(_)
            | Self::R2d2(_)
            | Self::SerdeJson(_) => ErrorSeverity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_sqlite_errors_are_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(StorageError::Rusqlite(busy).is_retryable());
        assert!(StorageError::PoolExhausted.is_retryable());
        assert!(!StorageError::WrongKeyOrNotEncrypted.is_retryable());
        assert!(!StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows).is_retryable());
    }

    #[test]
    fn wrong_key_is_critical() {
        assert!(StorageError::WrongKeyOrNotEncrypted.is_critical());
        assert_eq!(StorageError::Timeout(5).severity(), ErrorSeverity::Warning);
        assert!(!StorageError::Query("syntax".into()).is_critical());
    }
}
