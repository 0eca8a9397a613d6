//! Key material resolution and OS keyring storage
//!
//! Turns configured [`KeySource`]s into core [`KeyMaterial`] and supplies
//! the SQLCipher page key, falling back to a keyring entry that is created
//! on first use.

use credstore_common::crypto::KEY_LEN;
use credstore_common::SecureString;
use credstore_core::{ConfiguredKey, KeyMaterial};
use credstore_domain::{CredStoreError, DatabaseConfig, EncryptionConfig, KeySource, Result};
use keyring::Entry;
use rand::Rng;
use tracing::info;

use crate::errors::InfraError;

const DATABASE_KEY_SERVICE: &str = "credstore";
const DATABASE_KEY_NAME: &str = "database_encryption_key";

/// Manages encryption keys using the system keyring
pub struct KeyManager;

impl KeyManager {
    /// Read the hex key stored under `service`/`user`.
    ///
    /// Returns `NotFound` when the entry does not exist.
    pub fn get_key(service: &str, user: &str) -> Result<String> {
        let entry = Self::entry(service, user)?;
        entry.get_password().map_err(|e| InfraError::from(e).into())
    }

    /// Read the key stored under `service`/`user`, generating and storing a
    /// fresh 32-byte hex key when the entry is missing.
    pub fn get_or_create_key(service: &str, user: &str) -> Result<String> {
        let entry = Self::entry(service, user)?;

        match entry.get_password() {
            Ok(key) => Ok(key),
            Err(keyring::Error::NoEntry) => {
                let key = Self::generate_key();
                entry.set_password(&key).map_err(|e| {
                    CredStoreError::Security(format!("Failed to store key in keyring: {e}"))
                })?;
                info!(service, user, "generated new key in OS keyring");
                Ok(key)
            }
            Err(e) => Err(InfraError::from(e).into()),
        }
    }

    /// Delete the stored key (use with caution!)
    pub fn delete_key(service: &str, user: &str) -> Result<()> {
        let entry = Self::entry(service, user)?;
        entry.delete_credential().map_err(|e| InfraError::from(e).into())
    }

    /// Resolve one configured key source into key material.
    pub fn resolve(source: &KeySource) -> Result<KeyMaterial> {
        match source {
            KeySource::Hex { value } => Ok(KeyMaterial::Hex(SecureString::new(value.clone()))),
            KeySource::Password { value } => {
                if value.is_empty() {
                    return Err(CredStoreError::config("password key source must not be empty"));
                }
                Ok(KeyMaterial::Password(SecureString::new(value.clone())))
            }
            KeySource::Keyring { service, user, create_if_missing } => {
                let key = if *create_if_missing {
                    Self::get_or_create_key(service, user)?
                } else {
                    Self::get_key(service, user)?
                };
                Ok(KeyMaterial::Hex(SecureString::new(key)))
            }
        }
    }

    /// Resolve the whole ordered key list, keeping each entry's active flag.
    pub fn configured_keys(config: &EncryptionConfig) -> Result<Vec<ConfiguredKey>> {
        config
            .keys
            .iter()
            .map(|descriptor| {
                Self::resolve(&descriptor.source)
                    .map(|material| ConfiguredKey::new(material, descriptor.active))
            })
            .collect()
    }

    /// SQLCipher page key: the configured value, else the keyring entry
    /// `credstore`/`database_encryption_key`, created when missing.
    pub fn database_key(config: &DatabaseConfig) -> Result<SecureString> {
        match config.encryption_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => Ok(SecureString::new(key.to_string())),
            None => Self::get_or_create_key(DATABASE_KEY_SERVICE, DATABASE_KEY_NAME)
                .map(SecureString::new),
        }
    }

    fn entry(service: &str, user: &str) -> Result<Entry> {
        Entry::new(service, user)
            .map_err(|e| CredStoreError::Security(format!("Failed to access keyring: {e}")))
    }

    /// Generate a new random encryption key
    fn generate_key() -> String {
        let mut rng = rand::thread_rng();
        let key: Vec<u8> = (0..KEY_LEN).map(|_| rng.gen()).collect();
        hex::encode(key)
    }
}
