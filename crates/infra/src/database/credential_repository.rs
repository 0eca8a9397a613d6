//! SQLCipher-backed credential name and version repository.
//!
//! Names are matched case-insensitively through the `NOCASE` collation on
//! `credential_name.name`. Version history is ordered newest first, with the
//! insertion sequence breaking timestamp ties. All database operations run
//! in `spawn_blocking` to avoid blocking the async runtime.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use credstore_common::storage::{SqlCipherConnection, StorageError};
use credstore_core::CredentialRepository;
use credstore_domain::{
    codes, CredStoreError, CredentialAttributes, CredentialName, CredentialSummary,
    CredentialType, CredentialVersion, PermissionEntry, Result as DomainResult,
};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::manager::DbManager;
use super::permission_repository::upsert_entries;
use super::{map_join_error, placeholders, timestamp_column, uuid_column};
use crate::errors::map_storage_error;

const SELECT_VERSION: &str = "SELECT v.uuid, n.uuid, n.name, v.type, v.key_id,
            v.encrypted_value, v.nonce,
            v.encrypted_generation_parameters, v.generation_parameters_nonce,
            v.ca_name, v.certificate, v.ca, v.public_key, v.username, v.salt,
            v.version_created_at, v.updated_at
     FROM credential_version v
     JOIN credential_name n ON n.uuid = v.credential_name_uuid";

/// Position of `v.type` in [`SELECT_VERSION`].
const TYPE_COLUMN: usize = 3;

const NEWEST_FIRST: &str = "ORDER BY v.version_created_at DESC, v.seq DESC";

/// SQLCipher-backed implementation of [`CredentialRepository`].
pub struct SqlCipherCredentialRepository {
    db: Arc<DbManager>,
}

impl SqlCipherCredentialRepository {
    /// Create a new repository with the given database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialRepository for SqlCipherCredentialRepository {
    async fn find_name(&self, name: &str) -> DomainResult<Option<CredentialName>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<CredentialName>> {
            let conn = db.get_connection()?;
            query_name(&conn, &name).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn all_names(&self) -> DomainResult<Vec<String>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<String>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT name FROM credential_name ORDER BY name")
                .map_err(map_storage_error)?;
            stmt.query_map(&[], |row| row.get(0)).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, name: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let mut conn = db.get_connection()?;
            delete_name(&mut conn, &name).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_most_recent(&self, name: &str) -> DomainResult<Option<CredentialVersion>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<CredentialVersion>> {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_VERSION} WHERE n.name = ?1 {NEWEST_FIRST} LIMIT 1");
            let mut versions = query_versions(&conn, &sql, &[&name])?;
            Ok(versions.pop())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_all_versions(&self, name: &str) -> DomainResult<Vec<CredentialVersion>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<CredentialVersion>> {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_VERSION} WHERE n.name = ?1 {NEWEST_FIRST}");
            query_versions(&conn, &sql, &[&name])
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> DomainResult<Option<CredentialVersion>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<CredentialVersion>> {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_VERSION} WHERE v.uuid = ?1");
            let mut versions = query_versions(&conn, &sql, &[&uuid.to_string()])?;
            Ok(versions.pop())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_containing_name(&self, fragment: &str) -> DomainResult<Vec<CredentialSummary>> {
        let db = Arc::clone(&self.db);
        let fragment = fragment.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<CredentialSummary>> {
            let conn = db.get_connection()?;
            query_summaries(&conn, "instr(lower(n.name), lower(?1)) > 0", &fragment)
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_starting_with_path(&self, prefix: &str) -> DomainResult<Vec<CredentialSummary>> {
        let db = Arc::clone(&self.db);
        let prefix = prefix.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<CredentialSummary>> {
            let conn = db.get_connection()?;
            query_summaries(&conn, "substr(lower(n.name), 1, length(?1)) = lower(?1)", &prefix)
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_certificate_names_by_ca_name(&self, ca_name: &str) -> DomainResult<Vec<String>> {
        let db = Arc::clone(&self.db);
        let ca_name = ca_name.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<String>> {
            let conn = db.get_connection()?;
            query_names_signed_by(&conn, &ca_name).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save(
        &self,
        version: CredentialVersion,
        grants: Vec<PermissionEntry>,
    ) -> DomainResult<CredentialVersion> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<CredentialVersion> {
            let mut conn = db.get_connection()?;
            let name = version.name.name.clone();
            insert_version(&mut conn, version, &grants)
                .map_err(map_storage_error)?
                .ok_or_else(|| CredStoreError::conflict(codes::CREDENTIAL_ALREADY_EXISTS, name))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_key_ids(
        &self,
        key_ids: &[Uuid],
        limit: usize,
    ) -> DomainResult<Vec<CredentialVersion>> {
        if key_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let db = Arc::clone(&self.db);
        let key_ids: Vec<String> = key_ids.iter().map(Uuid::to_string).collect();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        task::spawn_blocking(move || -> DomainResult<Vec<CredentialVersion>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "{SELECT_VERSION} WHERE v.key_id IN ({}) ORDER BY v.seq LIMIT ?{}",
                placeholders(key_ids.len()),
                key_ids.len() + 1
            );
            let mut values: Vec<&dyn ToSql> = key_ids.iter().map(|id| id as &dyn ToSql).collect();
            values.push(&limit);
            query_versions(&conn, &sql, &values)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_encryption(
        &self,
        version: &CredentialVersion,
        expected_key_id: Uuid,
        expected_nonce: &[u8],
    ) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let version = version.clone();
        let expected_nonce = expected_nonce.to_vec();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE credential_version
                     SET key_id = ?1, encrypted_value = ?2, nonce = ?3,
                         encrypted_generation_parameters = ?4, generation_parameters_nonce = ?5,
                         updated_at = ?6
                     WHERE uuid = ?7 AND key_id = ?8 AND nonce = ?9",
                    params![
                        version.key_id.to_string(),
                        version.encrypted_value,
                        version.nonce,
                        version.encrypted_generation_parameters,
                        version.generation_parameters_nonce,
                        version.updated_at.timestamp_micros(),
                        version.uuid.to_string(),
                        expected_key_id.to_string(),
                        expected_nonce,
                    ],
                )
                .map_err(map_storage_error)?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_by_key_id(&self) -> DomainResult<HashMap<Uuid, u64>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<HashMap<Uuid, u64>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT key_id, COUNT(*) FROM credential_version GROUP BY key_id")
                .map_err(map_storage_error)?;
            let counts = stmt
                .query_map(&[], |row| {
                    let count: i64 = row.get(1)?;
                    Ok((uuid_column(row, 0)?, u64::try_from(count).unwrap_or_default()))
                })
                .map_err(map_storage_error)?;
            Ok(counts.into_iter().collect())
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Synchronous SQL Operations (called inside spawn_blocking)
// ============================================================================

fn query_name(
    conn: &SqlCipherConnection,
    name: &str,
) -> Result<Option<CredentialName>, StorageError> {
    match conn.query_row(
        "SELECT uuid, name FROM credential_name WHERE name = ?1",
        params![name],
        map_name_row,
    ) {
        Ok(found) => Ok(Some(found)),
        Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run a `SELECT_VERSION` query. A `type` tag no variant claims is a
/// configuration error rather than a database fault.
fn query_versions(
    conn: &SqlCipherConnection,
    sql: &str,
    values: &[&dyn ToSql],
) -> DomainResult<Vec<CredentialVersion>> {
    let mut stmt = conn.prepare(sql).map_err(map_storage_error)?;
    stmt.query_map(values, map_version_row).map_err(|err| match err {
        StorageError::Rusqlite(rusqlite::Error::FromSqlConversionFailure(
            TYPE_COLUMN,
            Type::Text,
            cause,
        )) => {
            CredStoreError::config_with_code(codes::UNKNOWN_CREDENTIAL_TYPE, cause.to_string())
        }
        other => map_storage_error(other),
    })
}

/// One summary per matching name, carrying its newest version timestamp.
fn query_summaries(
    conn: &SqlCipherConnection,
    predicate: &str,
    value: &str,
) -> Result<Vec<CredentialSummary>, StorageError> {
    let sql = format!(
        "SELECT n.name, MAX(v.version_created_at) AS latest
         FROM credential_name n
         JOIN credential_version v ON v.credential_name_uuid = n.uuid
         WHERE {predicate}
         GROUP BY n.uuid
         ORDER BY latest DESC, n.name"
    );
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(params![value], |row| {
        Ok(CredentialSummary { name: row.get(0)?, version_created_at: timestamp_column(row, 1)? })
    })
}

/// Names whose most recent version is a certificate issued by `ca_name`.
fn query_names_signed_by(
    conn: &SqlCipherConnection,
    ca_name: &str,
) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT n.name
         FROM credential_name n
         JOIN credential_version v ON v.credential_name_uuid = n.uuid
         WHERE v.seq = (
                SELECT latest.seq FROM credential_version latest
                WHERE latest.credential_name_uuid = n.uuid
                ORDER BY latest.version_created_at DESC, latest.seq DESC
                LIMIT 1)
           AND v.type = 'certificate'
           AND v.ca_name = ?1
         ORDER BY n.name",
    )?;
    stmt.query_map(params![ca_name], |row| row.get(0))
}

/// Resolve or create the name, insert the version and merge grants, all in
/// one transaction. The returned version carries the stored name identity.
///
/// Returns `None` without writing when the name is already stored under a
/// different uuid than the version expects.
fn insert_version(
    conn: &mut SqlCipherConnection,
    mut version: CredentialVersion,
    grants: &[PermissionEntry],
) -> Result<Option<CredentialVersion>, StorageError> {
    let tx = conn.transaction()?;

    let existing = tx
        .query_row(
            "SELECT uuid, name FROM credential_name WHERE name = ?1",
            params![version.name.name],
            map_name_row,
        )
        .optional()?;
    match existing {
        Some(name) if name.uuid != version.name.uuid => {
            debug!(name = %name.name, "credential name already owned by another identity");
            return Ok(None);
        }
        Some(name) => version.name = name,
        None => {
            tx.execute(
                "INSERT INTO credential_name (uuid, name) VALUES (?1, ?2)",
                params![version.name.uuid.to_string(), version.name.name],
            )?;
            debug!(name = %version.name.name, "credential name created");
        }
    }

    let name_uuid = version.name.uuid.to_string();
    let attributes = &version.attributes;
    tx.execute(
        "INSERT INTO credential_version (
            uuid, credential_name_uuid, type, encrypted_value, nonce, key_id,
            encrypted_generation_parameters, generation_parameters_nonce,
            ca_name, certificate, ca, public_key, username, salt,
            version_created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            version.uuid.to_string(),
            name_uuid,
            version.credential_type.to_string(),
            version.encrypted_value,
            version.nonce,
            version.key_id.to_string(),
            version.encrypted_generation_parameters,
            version.generation_parameters_nonce,
            attributes.ca_name,
            attributes.certificate,
            attributes.ca,
            attributes.public_key,
            attributes.username,
            attributes.salt,
            version.version_created_at.timestamp_micros(),
            version.updated_at.timestamp_micros(),
        ],
    )?;

    upsert_entries(&tx, &name_uuid, grants)?;
    tx.commit()?;
    Ok(Some(version))
}

/// Remove a name, its versions and its access entries together.
fn delete_name(conn: &mut SqlCipherConnection, name: &str) -> Result<bool, StorageError> {
    let tx = conn.transaction()?;

    let Some(uuid) = tx
        .query_row("SELECT uuid FROM credential_name WHERE name = ?1", params![name], |row| {
            row.get::<_, String>(0)
        })
        .optional()?
    else {
        return Ok(false);
    };

    tx.execute("DELETE FROM access_entry WHERE credential_name_uuid = ?1", params![uuid])?;
    tx.execute("DELETE FROM credential_version WHERE credential_name_uuid = ?1", params![uuid])?;
    tx.execute("DELETE FROM credential_name WHERE uuid = ?1", params![uuid])?;
    tx.commit()?;
    Ok(true)
}

// ============================================================================
// Row mapping
// ============================================================================

fn map_name_row(row: &Row<'_>) -> rusqlite::Result<CredentialName> {
    Ok(CredentialName { uuid: uuid_column(row, 0)?, name: row.get(1)? })
}

fn map_version_row(row: &Row<'_>) -> rusqlite::Result<CredentialVersion> {
    let raw_type: String = row.get(TYPE_COLUMN)?;
    let credential_type = raw_type.parse::<CredentialType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(TYPE_COLUMN, Type::Text, e.into())
    })?;

    Ok(CredentialVersion {
        uuid: uuid_column(row, 0)?,
        name: CredentialName { uuid: uuid_column(row, 1)?, name: row.get(2)? },
        credential_type,
        key_id: uuid_column(row, 4)?,
        encrypted_value: row.get(5)?,
        nonce: row.get(6)?,
        encrypted_generation_parameters: row.get(7)?,
        generation_parameters_nonce: row.get(8)?,
        attributes: CredentialAttributes {
            ca_name: row.get(9)?,
            certificate: row.get(10)?,
            ca: row.get(11)?,
            public_key: row.get(12)?,
            username: row.get(13)?,
            salt: row.get(14)?,
        },
        version_created_at: timestamp_column(row, 15)?,
        updated_at: timestamp_column(row, 16)?,
    })
}
