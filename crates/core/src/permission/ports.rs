//! Port interfaces for access entries

use async_trait::async_trait;
use credstore_domain::{AccessEntry, OperationSet, PermissionEntry, PermissionOperation, Result};
use uuid::Uuid;

/// Persistence for per-actor access entries.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn find_all(&self, credential_name_uuid: Uuid) -> Result<Vec<AccessEntry>>;

    /// Operations `actor` holds on `name`, or `None` when it has no entry
    /// or the name does not exist.
    async fn find_operations(&self, name: &str, actor: &str) -> Result<Option<OperationSet>>;

    /// Every name on which `actor` holds `operation`, in one lookup.
    async fn find_names_granting(
        &self,
        actor: &str,
        operation: PermissionOperation,
    ) -> Result<Vec<String>>;

    /// OR `entries` into the existing entries, creating unseen actors.
    async fn merge(
        &self,
        credential_name_uuid: Uuid,
        entries: Vec<PermissionEntry>,
    ) -> Result<Vec<AccessEntry>>;

    async fn delete(&self, credential_name_uuid: Uuid, actor: &str) -> Result<bool>;
}
