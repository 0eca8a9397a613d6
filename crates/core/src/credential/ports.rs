//! Port interfaces for credential names and versions

use std::collections::HashMap;

use async_trait::async_trait;
use credstore_domain::{
    CredentialName, CredentialSummary, CredentialVersion, PermissionEntry, Result,
};
use uuid::Uuid;

/// Persistence for credential names and their version history.
///
/// Name arguments are normalized (leading `/`) and matched
/// case-insensitively. Version lists are newest first, ties broken by
/// insertion order.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    // Names
    async fn find_name(&self, name: &str) -> Result<Option<CredentialName>>;

    /// Every stored credential name
    async fn all_names(&self) -> Result<Vec<String>>;

    /// Remove a name with its versions and access entries in one transaction
    async fn delete(&self, name: &str) -> Result<bool>;

    // Versions
    async fn find_most_recent(&self, name: &str) -> Result<Option<CredentialVersion>>;

    async fn find_all_versions(&self, name: &str) -> Result<Vec<CredentialVersion>>;

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<CredentialVersion>>;

    /// Case-insensitive substring search, most recently written first
    async fn find_containing_name(&self, fragment: &str) -> Result<Vec<CredentialSummary>>;

    /// Case-insensitive prefix search, most recently written first
    async fn find_starting_with_path(&self, prefix: &str) -> Result<Vec<CredentialSummary>>;

    /// Names of certificate credentials whose most recent version was issued by `ca_name`
    async fn find_certificate_names_by_ca_name(&self, ca_name: &str) -> Result<Vec<String>>;

    /// Insert `version`, creating its name when needed, and merge `grants`
    /// into the name's access entries. All or nothing.
    async fn save(
        &self,
        version: CredentialVersion,
        grants: Vec<PermissionEntry>,
    ) -> Result<CredentialVersion>;

    // Rotation
    /// Up to `limit` versions encrypted under any of `key_ids`
    async fn find_by_key_ids(&self, key_ids: &[Uuid], limit: usize)
        -> Result<Vec<CredentialVersion>>;

    /// Rewrite the encryption columns of `version` in place, but only if the
    /// row still carries `expected_key_id` and `expected_nonce`.
    ///
    /// Returns `false` when a concurrent write changed the row first.
    async fn update_encryption(
        &self,
        version: &CredentialVersion,
        expected_key_id: Uuid,
        expected_nonce: &[u8],
    ) -> Result<bool>;

    /// Number of versions stored under each key id
    async fn count_by_key_id(&self) -> Result<HashMap<Uuid, u64>>;
}
