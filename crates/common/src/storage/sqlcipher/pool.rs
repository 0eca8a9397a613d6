//! r2d2 pool of SQLCipher connections

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
use super::config::SqlCipherPoolConfig;
use super::connection::SqlCipherConnection;
use super::is_wrong_key_error;
use super::pragmas::apply_connection_pragmas;
use crate::storage::error::{StorageError, StorageResult};

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub connections: u32,
    pub idle_connections: u32,
    pub max_size: u32,
}

/// Every connection handed out is keyed and has its pragmas applied.
/// Construction fails fast when the key does not open the database.
#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
}

impl SqlCipherPool {
    #[instrument(skip(cipher), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        cipher: SqlCipherConfig,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        let pragma_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            configure_sqlcipher(conn, &cipher)
                .and_then(|()| apply_connection_pragmas(conn, &pragma_config))
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                classify_pool_error(&e, "Failed to create pool")
            })?;

        {
            let conn = pool.get().map_err(|e| classify_pool_error(&e, "Failed to get connection"))?;
            verify_encryption(&conn)?;
            debug!("Encryption verified");
        }

        info!(max_size = config.max_size, "SQLCipher pool ready");
        Ok(Self { pool, config })
    }

    pub fn get_sqlcipher_connection(&self) -> StorageResult<SqlCipherConnection> {
        self.pool.get().map(SqlCipherConnection::new).map_err(|e| {
            if e.to_string().to_lowercase().contains("timed out") {
                warn!(timeout = ?self.config.connection_timeout, "Connection pool timeout");
                StorageError::Timeout(self.config.connection_timeout.as_secs())
            } else {
                classify_pool_error(&e, "Failed to get connection")
            }
        })
    }

    pub fn state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            connections: state.connections,
            idle_connections: state.idle_connections,
            max_size: self.config.max_size,
        }
    }
}

fn classify_pool_error(err: &r2d2::Error, context: &str) -> StorageError {
    if is_wrong_key_error(&err.to_string()) {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Connection(format!("{context}: {err}"))
    }
}
