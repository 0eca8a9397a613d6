//! A fully wired vault over in-memory ports

use std::sync::Arc;

use credstore_common::{EncryptionService, SecureString};
use credstore_core::credential::ports::CredentialRepository;
use credstore_core::{
    CertificateGenerator, ConfiguredKey, CredentialFactory, CredentialService, CredentialStore,
    CredentialVault, Encryptor, KeyMaterial, KeyRegistry, PermissionService, RotationEngine,
};
use credstore_domain::{
    CertificateGenerationParameters, CredentialValue, GenerationParameters, SubjectName,
};

use super::generators::{FakeCertificateCodec, FakeKeyPairGenerator};
use super::repositories::{InMemoryCanaries, InMemoryRepository, RecordingAuditSink};

pub const ALICE: &str = "uaa-user:alice";
pub const BOB: &str = "uaa-user:bob";
pub const CAROL: &str = "uaa-client:carol";

pub fn hex_key() -> KeyMaterial {
    KeyMaterial::Hex(SecureString::new(hex::encode(EncryptionService::generate_key())))
}

pub fn password_key(passphrase: &str) -> KeyMaterial {
    KeyMaterial::Password(SecureString::new(passphrase.to_string()))
}

pub fn password(value: &str) -> CredentialValue {
    CredentialValue::Password(value.to_string())
}

/// Self-signed CA request with common name `cn`.
pub fn ca_request(cn: &str) -> GenerationParameters {
    GenerationParameters::Certificate(CertificateGenerationParameters {
        subject: SubjectName { common_name: Some(cn.to_string()), ..SubjectName::default() },
        is_ca: true,
        ..CertificateGenerationParameters::default()
    })
}

/// Leaf certificate request signed by the CA credential `ca`.
pub fn leaf_request(cn: &str, ca: &str) -> GenerationParameters {
    GenerationParameters::Certificate(CertificateGenerationParameters {
        subject: SubjectName { common_name: Some(cn.to_string()), ..SubjectName::default() },
        alternative_names: vec![format!("{cn}.example.com")],
        extended_key_usage: vec!["server_auth".into()],
        ca: Some(ca.to_string()),
        ..CertificateGenerationParameters::default()
    })
}

/// Vault plus handles on every in-memory port behind it.
pub struct TestVault {
    pub repository: InMemoryRepository,
    pub canaries: InMemoryCanaries,
    pub audit: RecordingAuditSink,
    pub key_pairs: FakeKeyPairGenerator,
    pub encryptor: Encryptor,
    pub vault: CredentialVault,
}

impl TestVault {
    pub async fn new() -> Self {
        Self::with_keys(&[ConfiguredKey::new(hex_key(), true)]).await
    }

    pub async fn with_keys(keys: &[ConfiguredKey]) -> Self {
        let audit = RecordingAuditSink::new();
        Self::build(InMemoryRepository::new(), InMemoryCanaries::new(), audit, keys).await
    }

    pub async fn with_audit(audit: RecordingAuditSink) -> Self {
        Self::build(
            InMemoryRepository::new(),
            InMemoryCanaries::new(),
            audit,
            &[ConfiguredKey::new(hex_key(), true)],
        )
        .await
    }

    /// Same storage, restarted with a different key list.
    pub async fn restart(&self, keys: &[ConfiguredKey]) -> Self {
        Self::build(self.repository.clone(), self.canaries.clone(), self.audit.clone(), keys).await
    }

    pub async fn build(
        repository: InMemoryRepository,
        canaries: InMemoryCanaries,
        audit: RecordingAuditSink,
        keys: &[ConfiguredKey],
    ) -> Self {
        let table = KeyRegistry::new(Arc::new(canaries.clone()))
            .resolve(keys)
            .await
            .expect("configured keys should resolve");
        let encryptor = Encryptor::new(Arc::new(table));

        let names: Arc<dyn CredentialRepository> = Arc::new(repository.clone());
        let permissions =
            Arc::new(PermissionService::new(Arc::clone(&names), Arc::new(repository.clone())));

        let key_pairs = FakeKeyPairGenerator::new();
        let certificates = Arc::new(CertificateGenerator::new(
            Arc::new(key_pairs.clone()),
            Arc::new(FakeCertificateCodec::new()),
        ));
        let credentials = Arc::new(
            CredentialService::new(
                CredentialStore::new(Arc::clone(&names)),
                CredentialFactory::new(encryptor.clone()),
                Arc::clone(&permissions),
            )
            .with_key_pair_generator(Arc::new(key_pairs.clone()))
            .with_certificate_generator(certificates),
        );

        let rotation = RotationEngine::new(names, Arc::new(canaries.clone()), encryptor.clone());
        let vault =
            CredentialVault::new(credentials, permissions, rotation, Arc::new(audit.clone()));

        Self { repository, canaries, audit, key_pairs, encryptor, vault }
    }

    /// Standalone engine over this vault's storage.
    pub fn rotation(&self, batch_size: usize) -> RotationEngine {
        RotationEngine::new(
            Arc::new(self.repository.clone()),
            Arc::new(self.canaries.clone()),
            self.encryptor.clone(),
        )
        .with_batch_size(batch_size)
    }
}
