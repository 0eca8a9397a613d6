//! Credential identity and version store
//!
//! Data access only. Callers are responsible for permission checks.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use credstore_domain::constants::NAME_SEPARATOR;
use credstore_domain::{
    normalize_name, CredentialName, CredentialSummary, PermissionEntry, Result,
};
use uuid::Uuid;

use super::factory::from_stored;
use super::ports::CredentialRepository;
use super::variant::Credential;

#[derive(Clone)]
pub struct CredentialStore {
    repository: Arc<dyn CredentialRepository>,
}

impl CredentialStore {
    pub fn new(repository: Arc<dyn CredentialRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn CredentialRepository> {
        &self.repository
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<CredentialName>> {
        self.repository.find_name(&normalize_name(name)).await
    }

    pub async fn most_recent(&self, name: &str) -> Result<Option<Credential>> {
        Ok(self.repository.find_most_recent(&normalize_name(name)).await?.map(from_stored))
    }

    /// Newest first.
    pub async fn all_versions(&self, name: &str) -> Result<Vec<Credential>> {
        let versions = self.repository.find_all_versions(&normalize_name(name)).await?;
        Ok(versions.into_iter().map(from_stored).collect())
    }

    pub async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Credential>> {
        Ok(self.repository.find_by_uuid(uuid).await?.map(from_stored))
    }

    pub async fn find_containing_name(&self, fragment: &str) -> Result<Vec<CredentialSummary>> {
        self.repository.find_containing_name(fragment.trim()).await
    }

    /// Prefix search; `prefix` gains a leading and a trailing `/`.
    pub async fn find_starting_with_path(&self, prefix: &str) -> Result<Vec<CredentialSummary>> {
        self.repository.find_starting_with_path(&directory_prefix(prefix)).await
    }

    pub async fn delete(&self, name: &str) -> Result<bool> {
        self.repository.delete(&normalize_name(name)).await
    }

    /// Persist `credential` and merge `grants` in one unit.
    pub async fn save(
        &self,
        credential: Credential,
        grants: Vec<PermissionEntry>,
    ) -> Result<Credential> {
        let saved = self.repository.save(credential.into_version(), grants).await?;
        Ok(from_stored(saved))
    }

    /// Sorted intermediate path prefixes of every stored name.
    pub async fn all_paths(&self) -> Result<BTreeSet<String>> {
        let names = self.repository.all_names().await?;
        Ok(paths_of(names.iter().map(String::as_str)))
    }
}

/// Normalize a browse prefix to `/segment/.../`.
pub(crate) fn directory_prefix(prefix: &str) -> String {
    let mut normalized = normalize_name(prefix);
    if !normalized.ends_with(NAME_SEPARATOR) {
        normalized.push(NAME_SEPARATOR);
    }
    normalized
}

/// Every proper directory prefix of each name, excluding the root.
///
/// `/a/b/c` contributes `/a/` and `/a/b/`. Prefixes that differ only by case
/// appear once, spelled as in the first name that produced them.
pub(crate) fn paths_of<'a>(names: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    let mut seen = HashSet::new();
    let mut paths = BTreeSet::new();
    for name in names {
        let name = normalize_name(name);
        let mut end = 1;
        while let Some(offset) = name[end..].find(NAME_SEPARATOR) {
            end += offset + 1;
            let path = &name[..end];
            if seen.insert(path.to_lowercase()) {
                paths.insert(path.to_string());
            }
        }
    }
    paths
}
