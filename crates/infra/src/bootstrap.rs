//! Application context - wires configuration, storage and services
//!
//! [`Bootstrap`] resolves the database key and configured key material,
//! opens and migrates the SQLCipher database, matches keys against their
//! canaries and assembles a [`CredentialVault`] over the SQLCipher
//! repositories.
//!
//! RSA/SSH key generation and X.509 encoding are supplied by the caller
//! through [`Bootstrap::with_key_pair_generator`] and
//! [`Bootstrap::with_certificate_codec`]; without them the matching
//! credential types cannot be generated.

use std::sync::Arc;

use credstore_common::storage::SqlCipherConfig;
use credstore_core::{
    AuditSink, CanaryRepository, CertificateCodec, CertificateGenerator, CredentialFactory,
    CredentialRepository, CredentialService, CredentialStore, CredentialVault, Encryptor,
    KeyPairGenerator, KeyRegistry, PermissionRepository, PermissionService, RotationEngine,
};
use credstore_domain::{Config, CredStoreError, Result};
use tokio::task;
use tracing::info;

use crate::database::{
    DbManager, SqlCipherCanaryRepository, SqlCipherCredentialRepository,
    SqlCipherPermissionRepository,
};
use crate::key_manager::KeyManager;
use crate::observability::TracingAuditSink;

/// Everything a running store needs, built once at startup.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub encryptor: Encryptor,
    pub vault: Arc<CredentialVault>,
}

impl AppContext {
    /// Build a context with default collaborators.
    pub async fn new(config: Config) -> Result<Self> {
        Bootstrap::new(config).build().await
    }
}

/// Builder for [`AppContext`].
pub struct Bootstrap {
    config: Config,
    key_pairs: Option<Arc<dyn KeyPairGenerator>>,
    codec: Option<Arc<dyn CertificateCodec>>,
    audit: Option<Arc<dyn AuditSink>>,
    kdf_iterations: Option<i32>,
}

impl Bootstrap {
    pub fn new(config: Config) -> Self {
        Self { config, key_pairs: None, codec: None, audit: None, kdf_iterations: None }
    }

    /// Enable `rsa` and `ssh` generation, and certificates when a codec is
    /// also supplied.
    pub fn with_key_pair_generator(mut self, generator: Arc<dyn KeyPairGenerator>) -> Self {
        self.key_pairs = Some(generator);
        self
    }

    pub fn with_certificate_codec(mut self, codec: Arc<dyn CertificateCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replace the default [`TracingAuditSink`].
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Override the SQLCipher PBKDF2 iteration count for the page key.
    pub fn with_kdf_iterations(mut self, iterations: i32) -> Self {
        self.kdf_iterations = Some(iterations);
        self
    }

    pub async fn build(self) -> Result<AppContext> {
        self.config.validate()?;

        let database = self.config.database.clone();
        let encryption = self.config.encryption.clone();
        let kdf_iterations = self.kdf_iterations;

        // Keyring access and pool creation both block.
        let (db, keys) = task::spawn_blocking(move || -> Result<_> {
            let keys = KeyManager::configured_keys(&encryption)?;
            let mut cipher = SqlCipherConfig::new(KeyManager::database_key(&database)?);
            if let Some(iterations) = kdf_iterations {
                cipher = cipher.with_kdf_iter(iterations);
            }
            let db = DbManager::from_config(&database, cipher)?;
            db.run_migrations()?;
            Ok((Arc::new(db), keys))
        })
        .await
        .map_err(|e| CredStoreError::Internal(format!("startup task failed: {e}")))??;

        let credentials: Arc<dyn CredentialRepository> =
            Arc::new(SqlCipherCredentialRepository::new(Arc::clone(&db)));
        let entries: Arc<dyn PermissionRepository> =
            Arc::new(SqlCipherPermissionRepository::new(Arc::clone(&db)));
        let canaries: Arc<dyn CanaryRepository> =
            Arc::new(SqlCipherCanaryRepository::new(Arc::clone(&db)));

        let table = KeyRegistry::new(Arc::clone(&canaries)).resolve(&keys).await?;
        let encryptor = Encryptor::new(Arc::new(table));

        let permissions = Arc::new(
            PermissionService::new(Arc::clone(&credentials), entries)
                .with_enforcement(self.config.permissions.enforce),
        );

        let mut service = CredentialService::new(
            CredentialStore::new(Arc::clone(&credentials)),
            CredentialFactory::new(encryptor.clone()),
            Arc::clone(&permissions),
        );
        if let Some(key_pairs) = &self.key_pairs {
            service = service.with_key_pair_generator(Arc::clone(key_pairs));
            if let Some(codec) = &self.codec {
                service = service.with_certificate_generator(Arc::new(CertificateGenerator::new(
                    Arc::clone(key_pairs),
                    Arc::clone(codec),
                )));
            }
        }

        let rotation = RotationEngine::new(credentials, canaries, encryptor.clone())
            .with_batch_size(self.config.rotation.batch_size);
        let audit = self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink::new()));
        let vault = Arc::new(CredentialVault::new(Arc::new(service), permissions, rotation, audit));

        info!(
            db_path = %db.path().display(),
            active_key_id = %encryptor.active_key_id(),
            unknown_keys = encryptor.key_table().unknown_key_ids().len(),
            enforce_permissions = self.config.permissions.enforce,
            "credential store ready"
        );

        Ok(AppContext { config: self.config, db, encryptor, vault })
    }
}
