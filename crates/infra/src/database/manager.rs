//! Database connection manager backed by the shared SQLCipher pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use credstore_common::storage::{
    SqlCipherConfig, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig,
};
use credstore_common::{ErrorClassification, SecureString};
use credstore_domain::{CredStoreError, DatabaseConfig, Result};
use rusqlite::params;
use tracing::{info, warn};

use crate::errors::{map_sql_error, map_storage_error};

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlCipherPool`].
pub struct DbManager {
    pool: Arc<SqlCipherPool>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and SQLCipher key.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        pool_size: u32,
        encryption_key: Option<&str>,
    ) -> Result<Self> {
        let key = encryption_key.map(ToOwned::to_owned).ok_or_else(|| {
            CredStoreError::Security("database encryption key not provided".into())
        })?;

        let config = SqlCipherPoolConfig::default().with_max_size(pool_size.max(1));
        Self::open(db_path, SqlCipherConfig::new(SecureString::new(key)), config)
    }

    /// Create a manager from the `[database]` section and resolved cipher settings.
    pub fn from_config(config: &DatabaseConfig, cipher: SqlCipherConfig) -> Result<Self> {
        let pool_config = SqlCipherPoolConfig::default()
            .with_max_size(config.pool_size.max(1))
            .with_connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .with_busy_timeout(Duration::from_millis(config.busy_timeout_ms));
        Self::open(&config.path, cipher, pool_config)
    }

    /// Create a manager with explicit cipher and pool settings.
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        cipher: SqlCipherConfig,
        config: SqlCipherPoolConfig,
    ) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let pool =
            SqlCipherPool::new(&path, cipher, config).map(Arc::new).map_err(map_storage_error)?;

        info!(
            db_path = %path.display(),
            max_connections = pool.state().max_size,
            "sqlcipher pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Borrow the underlying SQLCipher pool.
    pub fn pool(&self) -> &Arc<SqlCipherPool> {
        &self.pool
    }

    /// Acquire a SQLCipher connection from the pool.
    pub fn get_connection(&self) -> Result<SqlCipherConnection> {
        self.pool.get_sqlcipher_connection().map_err(|err| {
            if err.is_retryable() {
                warn!(error = %err, severity = %err.severity(), "transient connection failure");
            }
            map_storage_error(err)
        })
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire a connection and run a trivial query against it.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(map_storage_error)?;
        Ok(())
    }
}

fn create_schema(conn: &SqlCipherConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(map_storage_error)?;
    Ok(())
}
