//! Per-connection SQLite pragmas

use rusqlite::Connection;

use super::config::SqlCipherPoolConfig;
use crate::storage::error::{StorageError, StorageResult};

/// WAL journaling, NORMAL sync, foreign keys and the busy timeout.
pub fn apply_connection_pragmas(
    conn: &Connection,
    config: &SqlCipherPoolConfig,
) -> StorageResult<()> {
    let mut batch = String::from("PRAGMA synchronous=NORMAL;\n");
    if config.enable_wal {
        batch.push_str("PRAGMA journal_mode=WAL;\nPRAGMA wal_autocheckpoint=1000;\n");
    }
    if config.enable_foreign_keys {
        batch.push_str("PRAGMA foreign_keys=ON;\n");
    }

    conn.execute_batch(&batch)
        .map_err(|e| StorageError::Query(format!("Failed to apply pragmas: {e}")))?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| StorageError::Query(format!("Failed to set busy timeout: {e}")))?;

    Ok(())
}
