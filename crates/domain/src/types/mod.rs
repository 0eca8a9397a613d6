//! Domain types and models
//!
//! Credential identity and versions, decrypted values, permissions, key
//! canaries, certificate requests and audit records.

pub mod audit;
pub mod certificate;
pub mod credential;
pub mod generation;
pub mod key;
pub mod permission;
pub mod value;

pub use audit::{AuditBatch, AuditOperationCode, AuditRecord};
pub use certificate::{CertificateGenerationParameters, ParsedCertificate, SubjectName};
pub use credential::{
    normalize_name, CredentialAttributes, CredentialName, CredentialSummary, CredentialType,
    CredentialVersion, Encryption, WriteMode,
};
pub use generation::{GenerationParameters, KeyPairParameters, StringGenerationParameters};
pub use key::EncryptionKeyCanary;
pub use permission::{AccessEntry, OperationSet, PermissionEntry, PermissionOperation};
pub use value::{CertificateValue, CredentialValue, CredentialView, KeyPairValue, UserValue};
