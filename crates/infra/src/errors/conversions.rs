//! Conversions from storage and keyring failures into [`CredStoreError`].
//!
//! Callers never learn which SQL statement failed. Wrong-key failures
//! become `Security` so a misconfigured page key is not reported as a
//! transient database problem.

use credstore_common::storage::StorageError;
use credstore_domain::CredStoreError;
use keyring::Error as KeyringError;
use rusqlite::ffi::ErrorCode;
use rusqlite::Error as SqlError;

const WRONG_KEY: &str = "SQLCipher key rejected or database not encrypted";

/// SQLite extended result codes the store reports by name.
const SQLITE_CONSTRAINT_PRIMARYKEY: i32 = 1555;
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
const SQLITE_CONSTRAINT_FOREIGNKEY: i32 = 787;

/// Newtype carrying a converted [`CredStoreError`] out of infrastructure
/// code.
#[derive(Debug)]
pub struct InfraError(pub CredStoreError);

impl From<InfraError> for CredStoreError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CredStoreError> for InfraError {
    fn from(value: CredStoreError) -> Self {
        Self(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        Self(map_sql_error(value))
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        Self(map_storage_error(value))
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        Self(map_keyring_error(value))
    }
}

/// `map_err` target for raw rusqlite calls.
pub fn map_sql_error(err: SqlError) -> CredStoreError {
    match err {
        SqlError::SqliteFailure(failure, message) => {
            let message = message.unwrap_or_default();
            match failure.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    CredStoreError::Database(format!("database is busy: {message}"))
                }
                ErrorCode::NotADatabase => CredStoreError::Security(WRONG_KEY.into()),
                ErrorCode::ConstraintViolation => constraint_error(failure.extended_code, &message),
                _ if message.to_ascii_lowercase().contains("not a database") => {
                    CredStoreError::Security(WRONG_KEY.into())
                }
                code => CredStoreError::Database(format!(
                    "sqlite failure {code:?} (code {}): {message}",
                    failure.extended_code
                )),
            }
        }
        SqlError::QueryReturnedNoRows => {
            CredStoreError::NotFound("no rows returned by query".into())
        }
        SqlError::FromSqlConversionFailure(column, _, cause) => {
            CredStoreError::Database(format!("stored value in column {column} is invalid: {cause}"))
        }
        other => CredStoreError::Database(other.to_string()),
    }
}

/// `map_err` target for pool and connection wrapper calls.
pub fn map_storage_error(err: StorageError) -> CredStoreError {
    match err {
        StorageError::Rusqlite(err) => map_sql_error(err),
        StorageError::WrongKeyOrNotEncrypted => CredStoreError::Security(WRONG_KEY.into()),
        StorageError::Encryption(message) => CredStoreError::Security(message),
        StorageError::InvalidConfig(message) => CredStoreError::config(message),
        other => CredStoreError::Database(other.to_string()),
    }
}

fn map_keyring_error(err: KeyringError) -> CredStoreError {
    match err {
        KeyringError::NoEntry => CredStoreError::NotFound("keyring entry not found".into()),
        KeyringError::BadEncoding(_) => {
            CredStoreError::Security("key in keyring is not valid UTF-8".into())
        }
        KeyringError::NoStorageAccess(cause) => {
            CredStoreError::Security(format!("keyring is not accessible: {cause}"))
        }
        other => CredStoreError::Security(format!("keyring failure: {other}")),
    }
}

fn constraint_error(extended_code: i32, message: &str) -> CredStoreError {
    let kind = match extended_code {
        SQLITE_CONSTRAINT_UNIQUE | SQLITE_CONSTRAINT_PRIMARYKEY => "unique constraint violation",
        SQLITE_CONSTRAINT_FOREIGNKEY => "foreign key constraint violation",
        _ => return CredStoreError::Database(format!("constraint violation: {message}")),
    };
    CredStoreError::Database(kind.into())
}
