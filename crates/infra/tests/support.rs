#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use credstore_common::storage::{SqlCipherConfig, SqlCipherPoolConfig};
use credstore_common::{EncryptionService, SecureString};
use credstore_core::AuditSink;
use credstore_domain::{
    AuditBatch, Config, DatabaseConfig, EncryptionConfig, KeyDescriptor, KeySource,
    Result as DomainResult,
};
use credstore_infra::database::DbManager;
use credstore_infra::{AppContext, Bootstrap};
use tempfile::TempDir;

pub const TEST_DB_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Low iteration count so each test opens its database quickly.
pub const TEST_KDF_ITER: i32 = 4_000;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a migrated database in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = open_manager(&temp_dir.path().join("test.db"));
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn open_manager(path: &Path) -> DbManager {
    DbManager::open(
        path,
        SqlCipherConfig::new(SecureString::new(TEST_DB_KEY.to_string()))
            .with_kdf_iter(TEST_KDF_ITER),
        SqlCipherPoolConfig::default().with_max_size(2),
    )
    .expect("db manager should be created")
}

/// Fresh random 32-byte key, hex encoded.
pub fn hex_key() -> String {
    hex::encode(EncryptionService::generate_key())
}

pub fn hex_descriptor(value: &str, active: bool) -> KeyDescriptor {
    KeyDescriptor { source: KeySource::Hex { value: value.to_string() }, active }
}

/// Config pointing at `path` with the given key list and a fixed page key.
pub fn config_for(path: &Path, keys: Vec<KeyDescriptor>) -> Config {
    Config {
        database: DatabaseConfig {
            path: path.to_string_lossy().into_owned(),
            pool_size: 2,
            encryption_key: Some(TEST_DB_KEY.to_string()),
            ..DatabaseConfig::default()
        },
        encryption: EncryptionConfig { keys },
        ..Config::default()
    }
}

/// A store directory that survives restarts with different key lists.
pub struct TestStore {
    pub audit: RecordingAuditSink,
    temp_dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        Self { audit: RecordingAuditSink::default(), temp_dir: TempDir::new().expect("temp dir") }
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("credstore.db")
    }

    /// Boot the store over the same database file with `keys`.
    pub async fn start(&self, keys: Vec<KeyDescriptor>) -> DomainResult<AppContext> {
        Bootstrap::new(config_for(&self.db_path(), keys))
            .with_kdf_iterations(TEST_KDF_ITER)
            .with_audit_sink(Arc::new(self.audit.clone()))
            .build()
            .await
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Default)]
pub struct RecordingAuditSink {
    batches: Arc<Mutex<Vec<AuditBatch>>>,
}

impl RecordingAuditSink {
    pub fn batches(&self) -> Vec<AuditBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, batch: AuditBatch) -> DomainResult<()> {
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}
