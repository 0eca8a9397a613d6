//! SQLCipher-backed encryption key canary repository.

use std::sync::Arc;

use async_trait::async_trait;
use credstore_core::CanaryRepository;
use credstore_domain::{EncryptionKeyCanary, Result as DomainResult};
use rusqlite::{params, ToSql};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use super::{map_join_error, placeholders, uuid_column};
use crate::errors::map_storage_error;

/// SQLCipher-backed implementation of [`CanaryRepository`].
pub struct SqlCipherCanaryRepository {
    db: Arc<DbManager>,
}

impl SqlCipherCanaryRepository {
    /// Create a new repository with the given database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CanaryRepository for SqlCipherCanaryRepository {
    async fn find_all(&self) -> DomainResult<Vec<EncryptionKeyCanary>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<EncryptionKeyCanary>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT uuid, encrypted_value, nonce, salt FROM encryption_key_canary")
                .map_err(map_storage_error)?;
            stmt.query_map(&[], |row| {
                Ok(EncryptionKeyCanary {
                    uuid: uuid_column(row, 0)?,
                    encrypted_value: row.get(1)?,
                    nonce: row.get(2)?,
                    salt: row.get(3)?,
                })
            })
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save(&self, canary: EncryptionKeyCanary) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO encryption_key_canary (uuid, encrypted_value, nonce, salt)
                 VALUES (?1, ?2, ?3, ?4)",
                params![canary.uuid.to_string(), canary.encrypted_value, canary.nonce, canary.salt],
            )
            .map_err(map_storage_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, uuids: &[Uuid]) -> DomainResult<usize> {
        if uuids.is_empty() {
            return Ok(0);
        }
        let db = Arc::clone(&self.db);
        let uuids: Vec<String> = uuids.iter().map(Uuid::to_string).collect();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let sql = format!(
                "DELETE FROM encryption_key_canary WHERE uuid IN ({})",
                placeholders(uuids.len())
            );
            let values: Vec<&dyn ToSql> = uuids.iter().map(|id| id as &dyn ToSql).collect();
            conn.execute(&sql, &values).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
