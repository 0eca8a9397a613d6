//! Permission checks and ACL management

use std::collections::HashSet;
use std::sync::Arc;

use credstore_domain::{
    codes, normalize_name, AuditOperationCode, CredStoreError, OperationSet, PermissionEntry,
    PermissionOperation, Result,
};
use tracing::debug;

use super::ports::PermissionRepository;
use crate::audit::AuditRecorder;
use crate::credential::ports::CredentialRepository;

/// Answers "may this actor do this" and edits access entries.
///
/// Read-style denials are reported exactly like a missing credential.
pub struct PermissionService {
    names: Arc<dyn CredentialRepository>,
    entries: Arc<dyn PermissionRepository>,
    enforce: bool,
}

impl PermissionService {
    pub fn new(
        names: Arc<dyn CredentialRepository>,
        entries: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self { names, entries, enforce: true }
    }

    /// Disable enforcement; every check then passes.
    pub fn with_enforcement(mut self, enforce: bool) -> Self {
        self.enforce = enforce;
        self
    }

    pub fn is_enforced(&self) -> bool {
        self.enforce
    }

    /// False both when `name` does not exist and when `actor` lacks `operation`.
    pub async fn check(
        &self,
        actor: &str,
        name: &str,
        operation: PermissionOperation,
    ) -> Result<bool> {
        if !self.enforce {
            return Ok(true);
        }
        let held = self.entries.find_operations(&normalize_name(name), actor).await?;
        Ok(held.is_some_and(|ops| ops.contains(operation)))
    }

    /// Lowercased names `actor` may read, fetched in one lookup.
    ///
    /// `None` when enforcement is off and every name is readable.
    pub async fn readable_names(&self, actor: &str) -> Result<Option<HashSet<String>>> {
        if !self.enforce {
            return Ok(None);
        }
        let names = self.entries.find_names_granting(actor, PermissionOperation::Read).await?;
        Ok(Some(names.into_iter().map(|name| name.to_lowercase()).collect()))
    }

    /// READ gate for lookups. Denial is indistinguishable from absence.
    pub async fn ensure_readable(&self, actor: &str, name: &str) -> Result<()> {
        if self.check(actor, name, PermissionOperation::Read).await? {
            Ok(())
        } else {
            Err(CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS))
        }
    }

    /// Gate for writes and deletes against a credential the caller already knows exists.
    pub async fn ensure_allowed(
        &self,
        actor: &str,
        name: &str,
        operation: PermissionOperation,
    ) -> Result<()> {
        if self.check(actor, name, operation).await? {
            Ok(())
        } else {
            debug!(actor, credential = name, %operation, "Permission denied");
            Err(CredStoreError::permission_denied_on(codes::CREDENTIAL_INVALID_ACCESS, name))
        }
    }

    /// Access entries on `name`; requires READ_ACL.
    pub async fn list(
        &self,
        actor: &str,
        name: &str,
        audit: &mut AuditRecorder,
    ) -> Result<Vec<PermissionEntry>> {
        let name = normalize_name(name);
        audit.credential(AuditOperationCode::AclAccess, &name);

        let not_found = || CredStoreError::not_found(codes::RESOURCE_NOT_FOUND);
        let credential_name = self.names.find_name(&name).await?.ok_or_else(not_found)?;
        if !self.check(actor, &name, PermissionOperation::ReadAcl).await? {
            return Err(not_found());
        }

        let entries = self.entries.find_all(credential_name.uuid).await?;
        Ok(entries.into_iter().map(PermissionEntry::from).collect())
    }

    /// Merge `grants` into the entries on `name`; requires WRITE_ACL.
    pub async fn grant(
        &self,
        actor: &str,
        name: &str,
        grants: Vec<PermissionEntry>,
        audit: &mut AuditRecorder,
    ) -> Result<Vec<PermissionEntry>> {
        if grants.is_empty() {
            return Err(CredStoreError::validation(codes::MISSING_ACES));
        }
        let name = normalize_name(name);

        let lacks_write = || CredStoreError::not_found(codes::ACL_LACKS_CREDENTIAL_WRITE);
        let credential_name = self.names.find_name(&name).await?.ok_or_else(lacks_write)?;
        if !self.check(actor, &name, PermissionOperation::WriteAcl).await? {
            return Err(lacks_write());
        }

        audit.permissions(AuditOperationCode::AclUpdate, &credential_name.name, &grants);
        let merged = self.entries.merge(credential_name.uuid, grants).await?;
        Ok(merged.into_iter().map(PermissionEntry::from).collect())
    }

    /// Remove `target`'s entry on `name`; requires WRITE_ACL.
    ///
    /// Returns `false` when the name or the entry did not exist.
    pub async fn revoke(
        &self,
        actor: &str,
        name: &str,
        target: &str,
        audit: &mut AuditRecorder,
    ) -> Result<bool> {
        let name = normalize_name(name);
        if !self.check(actor, &name, PermissionOperation::WriteAcl).await? {
            return Err(CredStoreError::not_found(codes::ACL_LACKS_CREDENTIAL_WRITE));
        }

        let Some(credential_name) = self.names.find_name(&name).await? else {
            return Ok(false);
        };
        let held = self
            .entries
            .find_operations(&name, target)
            .await?
            .unwrap_or_else(OperationSet::empty);

        let removed = self.entries.delete(credential_name.uuid, target).await?;
        if removed {
            audit.permissions(
                AuditOperationCode::AclDelete,
                &credential_name.name,
                &[PermissionEntry { actor: target.to_string(), operations: held }],
            );
        }
        Ok(removed)
    }
}
