//! SQLCipher-backed access entry repository.

use std::sync::Arc;

use async_trait::async_trait;
use credstore_common::storage::{SqlCipherConnection, StorageError};
use credstore_core::PermissionRepository;
use credstore_domain::{
    AccessEntry, OperationSet, PermissionEntry, PermissionOperation, Result as DomainResult,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::DbManager;
use super::{map_join_error, uuid_column};
use crate::errors::map_storage_error;

/// SQLCipher-backed implementation of [`PermissionRepository`].
///
/// Operations are stored as a bitmask; merging ORs the new bits into the
/// existing row so a grant never removes what an actor already holds.
pub struct SqlCipherPermissionRepository {
    db: Arc<DbManager>,
}

impl SqlCipherPermissionRepository {
    /// Create a new repository with the given database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PermissionRepository for SqlCipherPermissionRepository {
    async fn find_all(&self, credential_name_uuid: Uuid) -> DomainResult<Vec<AccessEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<AccessEntry>> {
            let conn = db.get_connection()?;
            query_entries(&conn, &credential_name_uuid.to_string()).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_operations(&self, name: &str, actor: &str) -> DomainResult<Option<OperationSet>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();
        let actor = actor.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<OperationSet>> {
            let conn = db.get_connection()?;
            query_operations(&conn, &name, &actor).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_names_granting(
        &self,
        actor: &str,
        operation: PermissionOperation,
    ) -> DomainResult<Vec<String>> {
        let db = Arc::clone(&self.db);
        let actor = actor.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<String>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT n.name
                     FROM access_entry e
                     JOIN credential_name n ON n.uuid = e.credential_name_uuid
                     WHERE e.actor = ?1 AND (e.operations & ?2) != 0
                     ORDER BY n.name",
                )
                .map_err(map_storage_error)?;
            stmt.query_map(params![actor, i64::from(operation.bit())], |row| row.get(0))
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn merge(
        &self,
        credential_name_uuid: Uuid,
        entries: Vec<PermissionEntry>,
    ) -> DomainResult<Vec<AccessEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<AccessEntry>> {
            let mut conn = db.get_connection()?;
            let name_uuid = credential_name_uuid.to_string();
            merge_entries(&mut conn, &name_uuid, &entries).map_err(map_storage_error)?;
            query_entries(&conn, &name_uuid).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, credential_name_uuid: Uuid, actor: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let actor = actor.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(
                    "DELETE FROM access_entry WHERE credential_name_uuid = ?1 AND actor = ?2",
                    params![credential_name_uuid.to_string(), actor],
                )
                .map_err(map_storage_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

/// OR each entry's operations into the stored row, inserting unseen actors.
///
/// Shared with the credential repository so a save and its grants commit
/// in the same transaction.
pub(super) fn upsert_entries(
    conn: &Connection,
    credential_name_uuid: &str,
    entries: &[PermissionEntry],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO access_entry (credential_name_uuid, actor, operations)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(credential_name_uuid, actor) DO UPDATE SET
            operations = operations | excluded.operations",
    )?;
    for entry in entries {
        let bits = i64::from(entry.operations.bits());
        stmt.execute(params![credential_name_uuid, entry.actor, bits])?;
    }
    Ok(())
}

fn merge_entries(
    conn: &mut SqlCipherConnection,
    credential_name_uuid: &str,
    entries: &[PermissionEntry],
) -> Result<(), StorageError> {
    let tx = conn.transaction()?;
    upsert_entries(&tx, credential_name_uuid, entries)?;
    tx.commit()?;
    Ok(())
}

fn query_entries(
    conn: &SqlCipherConnection,
    credential_name_uuid: &str,
) -> Result<Vec<AccessEntry>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT credential_name_uuid, actor, operations
         FROM access_entry
         WHERE credential_name_uuid = ?1
         ORDER BY id",
    )?;
    stmt.query_map(params![credential_name_uuid], map_entry_row)
}

fn query_operations(
    conn: &SqlCipherConnection,
    name: &str,
    actor: &str,
) -> Result<Option<OperationSet>, StorageError> {
    match conn.query_row(
        "SELECT e.operations
         FROM access_entry e
         JOIN credential_name n ON n.uuid = e.credential_name_uuid
         WHERE n.name = ?1 AND e.actor = ?2",
        params![name, actor],
        |row| operations_column(row, 0),
    ) {
        Ok(operations) => Ok(Some(operations)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<AccessEntry> {
    Ok(AccessEntry {
        credential_name_uuid: uuid_column(row, 0)?,
        actor: row.get(1)?,
        operations: operations_column(row, 2)?,
    })
}

fn operations_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OperationSet> {
    let bits: i64 = row.get(idx)?;
    OperationSet::from_bits(bits)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}
