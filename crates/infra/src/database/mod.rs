//! Database implementations

pub mod canary_repository;
pub mod credential_repository;
pub mod manager;
pub mod permission_repository;

pub use canary_repository::SqlCipherCanaryRepository;
pub use credential_repository::SqlCipherCredentialRepository;
pub use manager::DbManager;
pub use permission_repository::SqlCipherPermissionRepository;

use chrono::{DateTime, Utc};
use credstore_domain::CredStoreError;
use rusqlite::types::Type;
use rusqlite::Row;
use tokio::task;
use uuid::Uuid;

fn map_join_error(err: task::JoinError) -> CredStoreError {
    if err.is_cancelled() {
        CredStoreError::Internal("blocking task cancelled".into())
    } else {
        CredStoreError::Internal(format!("blocking task failed: {err}"))
    }
}

/// Uuids are stored as hyphenated text.
fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Timestamps are stored as microseconds since the epoch.
fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {micros}").into(),
        )
    })
}

/// `?1, ?2, ...` for an `IN` list of `count` parameters.
fn placeholders(count: usize) -> String {
    (1..=count).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}
