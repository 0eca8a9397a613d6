//! Configuration structures
//!
//! Loaded by the infrastructure layer from TOML/JSON files or `CREDSTORE_*`
//! environment variables.

use serde::{Deserialize, Serialize};

use crate::constants::ROTATION_BATCH_SIZE;
use crate::errors::{codes, CredStoreError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub encryption: EncryptionConfig,
    pub rotation: RotationConfig,
    pub permissions: PermissionsConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the store cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(CredStoreError::config("database.path must not be empty"));
        }
        if self.database.pool_size == 0 {
            return Err(CredStoreError::config("database.pool_size must be greater than 0"));
        }
        if self.rotation.batch_size == 0 {
            return Err(CredStoreError::config("rotation.batch_size must be greater than 0"));
        }
        match self.encryption.keys.iter().filter(|k| k.active).count() {
            1 => Ok(()),
            0 => Err(CredStoreError::config_with_code(
                codes::MISSING_ACTIVE_KEY,
                "exactly one encryption key must be marked active",
            )),
            n => Err(CredStoreError::config_with_code(
                codes::TOO_MANY_ACTIVE_KEYS,
                format!("{n} encryption keys are marked active"),
            )),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
    pub busy_timeout_ms: u64,
    /// SQLCipher page key. Falls back to the OS keyring when absent.
    pub encryption_key: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "credstore.db".to_string(),
            pool_size: 10,
            connection_timeout_secs: 5,
            busy_timeout_ms: 5000,
            encryption_key: None,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("path", &self.path)
            .field("pool_size", &self.pool_size)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Ordered list of key descriptors; exactly one is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub keys: Vec<KeyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    pub source: KeySource,
    #[serde(default)]
    pub active: bool,
}

/// Where a key's material comes from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum KeySource {
    /// 32 bytes, hex encoded.
    Hex { value: String },
    /// Passphrase stretched with Argon2; the salt lives on the canary.
    Password { value: String },
    /// Hex key stored in the OS keyring.
    Keyring {
        service: String,
        user: String,
        #[serde(default)]
        create_if_missing: bool,
    },
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hex { .. } => f.write_str("KeySource::Hex([REDACTED])"),
            Self::Password { .. } => f.write_str("KeySource::Password([REDACTED])"),
            Self::Keyring { service, user, create_if_missing } => f
                .debug_struct("KeySource::Keyring")
                .field("service", service)
                .field("user", user)
                .field("create_if_missing", create_if_missing)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub batch_size: usize,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self { batch_size: ROTATION_BATCH_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// When false every permission check passes.
    pub enforce: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self { enforce: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
