//! Mock repository implementations for testing
//!
//! One shared in-memory state backs both the credential and the permission
//! ports, the same way a single database does in production.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use credstore_core::audit::AuditSink;
use credstore_core::credential::ports::CredentialRepository;
use credstore_core::keys::ports::CanaryRepository;
use credstore_core::permission::ports::PermissionRepository;
use credstore_domain::{
    codes, AccessEntry, AuditBatch, CredStoreError, CredentialName, CredentialSummary,
    CredentialType, CredentialVersion, EncryptionKeyCanary, OperationSet, PermissionEntry,
    PermissionOperation, Result as DomainResult,
};
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct State {
    names: Vec<CredentialName>,
    /// Insertion order doubles as the tie breaker for equal timestamps.
    versions: Vec<CredentialVersion>,
    entries: Vec<AccessEntry>,
    failing_saves: HashSet<String>,
    /// Rotation updates still allowed before the next one fails.
    rotation_updates_left: Option<usize>,
}

impl State {
    fn name(&self, raw: &str) -> Option<&CredentialName> {
        self.names.iter().find(|n| n.matches(raw))
    }

    fn versions_of(&self, raw: &str) -> Vec<CredentialVersion> {
        let Some(name) = self.name(raw) else { return Vec::new() };
        let mut found: Vec<(usize, &CredentialVersion)> =
            self.versions.iter().enumerate().filter(|(_, v)| v.name.uuid == name.uuid).collect();
        found.sort_by(|(ai, a), (bi, b)| {
            b.version_created_at.cmp(&a.version_created_at).then(bi.cmp(ai))
        });
        found.into_iter().map(|(_, v)| v.clone()).collect()
    }

    fn summaries(&self, keep: impl Fn(&str) -> bool) -> Vec<CredentialSummary> {
        let mut summaries: Vec<CredentialSummary> = self
            .names
            .iter()
            .filter(|n| keep(&n.name.to_lowercase()))
            .filter_map(|n| {
                self.versions_of(&n.name).first().map(|v| CredentialSummary {
                    name: n.name.clone(),
                    version_created_at: v.version_created_at,
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.version_created_at.cmp(&a.version_created_at));
        summaries
    }

    fn merge(&mut self, name_uuid: Uuid, grants: Vec<PermissionEntry>) {
        for grant in grants {
            match self
                .entries
                .iter_mut()
                .find(|e| e.credential_name_uuid == name_uuid && e.actor == grant.actor)
            {
                Some(entry) => entry.operations = entry.operations.merge(grant.operations),
                None => self.entries.push(AccessEntry {
                    credential_name_uuid: name_uuid,
                    actor: grant.actor,
                    operations: grant.operations,
                }),
            }
        }
    }
}

/// In-memory credential and permission store.
#[derive(Default, Clone)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every save of `name` fail with a database error.
    pub fn fail_saves_for(&self, name: &str) {
        self.state.lock().failing_saves.insert(name.to_lowercase());
    }

    /// Let `successes` rotation updates through, fail the next one, then
    /// behave normally again.
    pub fn fail_rotation_update_after(&self, successes: usize) {
        self.state.lock().rotation_updates_left = Some(successes);
    }

    pub fn version_count(&self) -> usize {
        self.state.lock().versions.len()
    }

    pub fn versions(&self) -> Vec<CredentialVersion> {
        self.state.lock().versions.clone()
    }

    /// Register `name` with no versions, as another writer's half-finished
    /// first save would look to a reader.
    pub fn claim_name(&self, name: &str) {
        let name = CredentialName::parse(name).expect("valid name");
        self.state.lock().names.push(name);
    }

    /// Put a version in place without going through a service.
    pub fn insert_raw(&self, version: CredentialVersion) {
        let mut state = self.state.lock();
        if state.name(&version.name.name).is_none() {
            state.names.push(version.name.clone());
        }
        state.versions.push(version);
    }
}

#[async_trait]
impl CredentialRepository for InMemoryRepository {
    async fn find_name(&self, name: &str) -> DomainResult<Option<CredentialName>> {
        Ok(self.state.lock().name(name).cloned())
    }

    async fn all_names(&self) -> DomainResult<Vec<String>> {
        Ok(self.state.lock().names.iter().map(|n| n.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> DomainResult<bool> {
        let mut state = self.state.lock();
        let Some(uuid) = state.name(name).map(|n| n.uuid) else { return Ok(false) };
        state.names.retain(|n| n.uuid != uuid);
        state.versions.retain(|v| v.name.uuid != uuid);
        state.entries.retain(|e| e.credential_name_uuid != uuid);
        Ok(true)
    }

    async fn find_most_recent(&self, name: &str) -> DomainResult<Option<CredentialVersion>> {
        Ok(self.state.lock().versions_of(name).into_iter().next())
    }

    async fn find_all_versions(&self, name: &str) -> DomainResult<Vec<CredentialVersion>> {
        Ok(self.state.lock().versions_of(name))
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> DomainResult<Option<CredentialVersion>> {
        Ok(self.state.lock().versions.iter().find(|v| v.uuid == uuid).cloned())
    }

    async fn find_containing_name(&self, fragment: &str) -> DomainResult<Vec<CredentialSummary>> {
        let fragment = fragment.to_lowercase();
        Ok(self.state.lock().summaries(|name| name.contains(&fragment)))
    }

    async fn find_starting_with_path(&self, prefix: &str) -> DomainResult<Vec<CredentialSummary>> {
        let prefix = prefix.to_lowercase();
        Ok(self.state.lock().summaries(|name| name.starts_with(&prefix)))
    }

    async fn find_certificate_names_by_ca_name(&self, ca_name: &str) -> DomainResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .names
            .iter()
            .filter(|n| {
                state.versions_of(&n.name).first().is_some_and(|v| {
                    let signed_by = v.attributes.ca_name.as_deref();
                    v.credential_type == CredentialType::Certificate
                        && signed_by.is_some_and(|ca| ca.eq_ignore_ascii_case(ca_name))
                })
            })
            .map(|n| n.name.clone())
            .collect())
    }

    async fn save(
        &self,
        mut version: CredentialVersion,
        grants: Vec<PermissionEntry>,
    ) -> DomainResult<CredentialVersion> {
        let mut state = self.state.lock();
        if state.failing_saves.contains(&version.name.name.to_lowercase()) {
            let message = format!("injected failure for {}", version.name.name);
            return Err(CredStoreError::Database(message));
        }

        match state.name(&version.name.name).cloned() {
            Some(existing) if existing.uuid != version.name.uuid => {
                return Err(CredStoreError::conflict(
                    codes::CREDENTIAL_ALREADY_EXISTS,
                    existing.name,
                ));
            }
            Some(existing) => version.name = existing,
            None => state.names.push(version.name.clone()),
        }
        let name_uuid = version.name.uuid;
        state.versions.push(version.clone());
        state.merge(name_uuid, grants);
        Ok(version)
    }

    async fn find_by_key_ids(
        &self,
        key_ids: &[Uuid],
        limit: usize,
    ) -> DomainResult<Vec<CredentialVersion>> {
        Ok(self
            .state
            .lock()
            .versions
            .iter()
            .filter(|v| key_ids.contains(&v.key_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_encryption(
        &self,
        version: &CredentialVersion,
        expected_key_id: Uuid,
        expected_nonce: &[u8],
    ) -> DomainResult<bool> {
        let mut state = self.state.lock();
        match state.rotation_updates_left {
            Some(0) => {
                state.rotation_updates_left = None;
                return Err(CredStoreError::Database("injected rotation failure".into()));
            }
            Some(left) => state.rotation_updates_left = Some(left - 1),
            None => {}
        }
        let Some(stored) = state.versions.iter_mut().find(|v| v.uuid == version.uuid) else {
            return Ok(false);
        };
        if stored.key_id != expected_key_id || stored.nonce != expected_nonce {
            return Ok(false);
        }
        stored.key_id = version.key_id;
        stored.encrypted_value = version.encrypted_value.clone();
        stored.nonce = version.nonce.clone();
        stored.encrypted_generation_parameters = version.encrypted_generation_parameters.clone();
        stored.generation_parameters_nonce = version.generation_parameters_nonce.clone();
        stored.updated_at = version.updated_at;
        Ok(true)
    }

    async fn count_by_key_id(&self) -> DomainResult<HashMap<Uuid, u64>> {
        let mut counts = HashMap::new();
        for version in &self.state.lock().versions {
            *counts.entry(version.key_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryRepository {
    async fn find_all(&self, credential_name_uuid: Uuid) -> DomainResult<Vec<AccessEntry>> {
        Ok(self
            .state
            .lock()
            .entries
            .iter()
            .filter(|e| e.credential_name_uuid == credential_name_uuid)
            .cloned()
            .collect())
    }

    async fn find_operations(&self, name: &str, actor: &str) -> DomainResult<Option<OperationSet>> {
        let state = self.state.lock();
        let Some(uuid) = state.name(name).map(|n| n.uuid) else { return Ok(None) };
        Ok(state
            .entries
            .iter()
            .find(|e| e.credential_name_uuid == uuid && e.actor == actor)
            .map(|e| e.operations))
    }

    async fn find_names_granting(
        &self,
        actor: &str,
        operation: PermissionOperation,
    ) -> DomainResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .names
            .iter()
            .filter(|n| {
                state.entries.iter().any(|e| {
                    e.credential_name_uuid == n.uuid
                        && e.actor == actor
                        && e.operations.contains(operation)
                })
            })
            .map(|n| n.name.clone())
            .collect())
    }

    async fn merge(
        &self,
        credential_name_uuid: Uuid,
        entries: Vec<PermissionEntry>,
    ) -> DomainResult<Vec<AccessEntry>> {
        self.state.lock().merge(credential_name_uuid, entries);
        PermissionRepository::find_all(self, credential_name_uuid).await
    }

    async fn delete(&self, credential_name_uuid: Uuid, actor: &str) -> DomainResult<bool> {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|e| !(e.credential_name_uuid == credential_name_uuid && e.actor == actor));
        Ok(state.entries.len() != before)
    }
}

/// In-memory mock for `CanaryRepository`.
#[derive(Default, Clone)]
pub struct InMemoryCanaries {
    canaries: Arc<Mutex<Vec<EncryptionKeyCanary>>>,
}

impl InMemoryCanaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<EncryptionKeyCanary> {
        self.canaries.lock().clone()
    }
}

#[async_trait]
impl CanaryRepository for InMemoryCanaries {
    async fn find_all(&self) -> DomainResult<Vec<EncryptionKeyCanary>> {
        Ok(self.snapshot())
    }

    async fn save(&self, canary: EncryptionKeyCanary) -> DomainResult<()> {
        self.canaries.lock().push(canary);
        Ok(())
    }

    async fn delete(&self, uuids: &[Uuid]) -> DomainResult<usize> {
        let mut canaries = self.canaries.lock();
        let before = canaries.len();
        canaries.retain(|c| !uuids.contains(&c.uuid));
        Ok(before - canaries.len())
    }
}

/// Audit sink that keeps every batch; optionally fails every write.
#[derive(Default, Clone)]
pub struct RecordingAuditSink {
    batches: Arc<Mutex<Vec<AuditBatch>>>,
    failing: bool,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn batches(&self) -> Vec<AuditBatch> {
        self.batches.lock().clone()
    }

    pub fn last(&self) -> Option<AuditBatch> {
        self.batches.lock().last().cloned()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, batch: AuditBatch) -> DomainResult<()> {
        if self.failing {
            return Err(CredStoreError::Database("audit table unavailable".into()));
        }
        self.batches.lock().push(batch);
        Ok(())
    }
}
