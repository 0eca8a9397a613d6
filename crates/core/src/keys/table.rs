//! Resolved key table

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use credstore_common::EncryptionService;
use credstore_domain::{CredStoreError, Result};
use uuid::Uuid;

/// Immutable mapping of key ids to usable ciphers.
///
/// Built once by [`KeyRegistry::resolve`](super::KeyRegistry::resolve) and
/// shared read-only by every component that encrypts or decrypts.
#[derive(Debug, Clone)]
pub struct KeyTable {
    active_key_id: Uuid,
    keys: HashMap<Uuid, Arc<EncryptionService>>,
    unknown_key_ids: HashSet<Uuid>,
}

impl KeyTable {
    pub fn new(
        active_key_id: Uuid,
        keys: HashMap<Uuid, Arc<EncryptionService>>,
        unknown_key_ids: HashSet<Uuid>,
    ) -> Result<Self> {
        if !keys.contains_key(&active_key_id) {
            return Err(CredStoreError::Internal(format!(
                "active key {active_key_id} has no cipher"
            )));
        }
        Ok(Self { active_key_id, keys, unknown_key_ids })
    }

    pub fn active_key_id(&self) -> Uuid {
        self.active_key_id
    }

    /// Decryptable keys other than the active one. Rotation targets.
    pub fn known_inactive_key_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> =
            self.keys.keys().copied().filter(|id| *id != self.active_key_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Canary ids no configured key could open.
    pub fn unknown_key_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.unknown_key_ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_known(&self, key_id: Uuid) -> bool {
        self.keys.contains_key(&key_id)
    }

    pub(crate) fn cipher(&self, key_id: Uuid) -> Option<&EncryptionService> {
        self.keys.get(&key_id).map(AsRef::as_ref)
    }

    pub(crate) fn active_cipher(&self) -> &EncryptionService {
        // `new` guarantees the active id is present.
        &self.keys[&self.active_key_id]
    }
}
