//! # CredStore Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Key resolution, the encryptor and the rotation engine
//! - Credential variants, factory, store and service
//! - Permission checks and ACL management
//! - Certificate parameter validation and bulk re-issue
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `credstore-common` and `credstore-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod audit;
pub mod certificate;
pub mod credential;
pub mod keys;
pub mod permission;
pub mod rotation;
pub mod vault;

pub use audit::{AuditRecorder, AuditSink};
pub use certificate::{
    BulkRegenerateResult, CertificateCodec, CertificateGenerator, CertificateParameters,
    CertificateRegenerator,
};
pub use credential::{
    Credential, CredentialFactory, CredentialRepository, CredentialService, CredentialStore,
    GenerateRequest, KeyPairGenerator, PasswordGenerator, SetRequest,
};
pub use keys::{CanaryRepository, ConfiguredKey, Encryptor, KeyMaterial, KeyRegistry, KeyTable};
pub use permission::{PermissionRepository, PermissionService};
pub use rotation::{RotationEngine, RotationReport};
pub use vault::CredentialVault;
