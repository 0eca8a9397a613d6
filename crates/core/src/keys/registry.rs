//! Startup resolution of configured keys against persisted canaries

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use credstore_common::EncryptionService;
use credstore_domain::constants::CANARY_VALUE;
use credstore_domain::{codes, CredStoreError, EncryptionKeyCanary, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::material::ConfiguredKey;
use super::ports::CanaryRepository;
use super::table::KeyTable;

/// Maps configured key material onto the key ids stored with credentials.
pub struct KeyRegistry {
    canaries: Arc<dyn CanaryRepository>,
}

impl KeyRegistry {
    pub fn new(canaries: Arc<dyn CanaryRepository>) -> Self {
        Self { canaries }
    }

    /// Resolve `keys` into a [`KeyTable`].
    ///
    /// Every configured key is tried against every persisted canary. A key
    /// that opens no canary gets a fresh one. Canaries no key can open are
    /// reported as unknown; they never stop startup.
    pub async fn resolve(&self, keys: &[ConfiguredKey]) -> Result<KeyTable> {
        match keys.iter().filter(|k| k.active).count() {
            1 => {}
            0 => {
                return Err(CredStoreError::config_with_code(
                    codes::MISSING_ACTIVE_KEY,
                    "exactly one encryption key must be marked active",
                ))
            }
            n => {
                return Err(CredStoreError::config_with_code(
                    codes::TOO_MANY_ACTIVE_KEYS,
                    format!("{n} encryption keys are marked active"),
                ))
            }
        }

        let canaries = self.canaries.find_all().await?;
        let mut ciphers: HashMap<Uuid, Arc<EncryptionService>> = HashMap::new();
        let mut active_key_id = None;

        for key in keys {
            let matched = match_canaries(key, &canaries)?;
            let ids: Vec<Uuid> = if matched.is_empty() {
                let (id, cipher) = self.create_canary(key).await?;
                ciphers.insert(id, cipher);
                vec![id]
            } else {
                let ids = matched.iter().map(|(id, _)| *id).collect();
                ciphers.extend(matched);
                ids
            };

            if key.active {
                active_key_id = ids.first().copied();
            }
        }

        let unknown: HashSet<Uuid> =
            canaries.iter().map(|c| c.uuid).filter(|id| !ciphers.contains_key(id)).collect();
        for id in &unknown {
            warn!(key_id = %id, "Canary does not match any configured encryption key");
        }

        let active_key_id = active_key_id.ok_or_else(|| {
            let message = "active key was not resolved";
            CredStoreError::config_with_code(codes::MISSING_ACTIVE_KEY, message)
        })?;

        info!(
            active_key_id = %active_key_id,
            known = ciphers.len(),
            unknown = unknown.len(),
            "Resolved encryption keys"
        );

        KeyTable::new(active_key_id, ciphers, unknown)
    }

    async fn create_canary(&self, key: &ConfiguredKey) -> Result<(Uuid, Arc<EncryptionService>)> {
        let cipher = key.material.cipher(None)?;
        let sealed = cipher
            .encrypt(CANARY_VALUE.as_bytes())
            .map_err(|e| CredStoreError::Security(e.to_string()))?;

        let canary = EncryptionKeyCanary {
            uuid: Uuid::new_v4(),
            encrypted_value: sealed.ciphertext,
            nonce: sealed.nonce,
            salt: cipher.password_salt().map(str::to_string),
        };
        let id = canary.uuid;
        self.canaries.save(canary).await?;

        info!(
            key_id = %id,
            fingerprint = %cipher.key_fingerprint(),
            "Created canary for new encryption key"
        );
        Ok((id, Arc::new(cipher)))
    }
}

/// Canaries `key` can open, each with the cipher that opened it.
fn match_canaries(
    key: &ConfiguredKey,
    canaries: &[EncryptionKeyCanary],
) -> Result<Vec<(Uuid, Arc<EncryptionService>)>> {
    let mut matched = Vec::new();

    if key.material.is_password() {
        // Each salted canary needs its own derivation.
        for canary in canaries {
            let Some(salt) = canary.salt.as_deref() else { continue };
            let cipher = match key.material.cipher(Some(salt)) {
                Ok(cipher) => cipher,
                Err(err) => {
                    debug!(
                        key_id = %canary.uuid,
                        error = %err,
                        "Skipping canary with unusable salt"
                    );
                    continue;
                }
            };
            if opens(&cipher, canary) {
                matched.push((canary.uuid, Arc::new(cipher)));
            }
        }
    } else {
        let cipher = Arc::new(key.material.cipher(None)?);
        for canary in canaries.iter().filter(|c| c.salt.is_none()) {
            if opens(&cipher, canary) {
                matched.push((canary.uuid, Arc::clone(&cipher)));
            }
        }
    }

    Ok(matched)
}

fn opens(cipher: &EncryptionService, canary: &EncryptionKeyCanary) -> bool {
    cipher
        .decrypt(&canary.encrypted_value, &canary.nonce)
        .is_ok_and(|plain| plain == CANARY_VALUE.as_bytes())
}
