//! Credential identity and persisted version types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::NAME_SEPARATOR;
use crate::errors::{codes, CredStoreError, Result};
use crate::impl_domain_status_conversions;

/// Prefix `name` with `/` when missing. Surrounding whitespace is dropped.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with(NAME_SEPARATOR) {
        trimmed.to_string()
    } else {
        format!("{NAME_SEPARATOR}{trimmed}")
    }
}

/// Unique, case-insensitive credential identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialName {
    pub uuid: Uuid,
    pub name: String,
}

impl CredentialName {
    /// Validate and normalize a raw name into a fresh, unsaved identity.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = Self::normalized(raw)?;
        Ok(Self { uuid: Uuid::new_v4(), name })
    }

    /// Validate and normalize a raw name without allocating an identity.
    pub fn normalized(raw: &str) -> Result<String> {
        if raw.trim().is_empty() {
            return Err(CredStoreError::validation(codes::MISSING_NAME));
        }
        let name = normalize_name(raw);
        if name == "/" || name.contains("//") || name.ends_with(NAME_SEPARATOR) {
            return Err(CredStoreError::validation_with_value(codes::INVALID_NAME, name));
        }
        Ok(name)
    }

    /// Case-insensitive comparison against a raw name.
    pub fn matches(&self, raw: &str) -> bool {
        self.name.eq_ignore_ascii_case(&normalize_name(raw))
    }
}

/// Credential type discriminator (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    Password,
    Certificate,
    Ssh,
    Rsa,
    Value,
    Json,
    User,
}

impl_domain_status_conversions!(CredentialType {
    Password => "password",
    Certificate => "certificate",
    Ssh => "ssh",
    Rsa => "rsa",
    Value => "value",
    Json => "json",
    User => "user",
});

impl CredentialType {
    pub const ALL: [Self; 7] = [
        Self::Password,
        Self::Certificate,
        Self::Ssh,
        Self::Rsa,
        Self::Value,
        Self::Json,
        Self::User,
    ];

    /// Whether the store can produce a fresh value for this type.
    pub fn is_generable(self) -> bool {
        !matches!(self, Self::Value | Self::Json)
    }
}

/// How a write treats a credential that already has versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Always write a new version.
    #[default]
    Overwrite,
    /// Keep the current version untouched.
    NoOverwrite,
    /// Write only when the requested value or parameters differ.
    Converge,
}

impl_domain_status_conversions!(WriteMode {
    Overwrite => "overwrite",
    NoOverwrite => "no-overwrite",
    Converge => "converge",
});

/// Name and most-recent timestamp returned by searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub name: String,
    pub version_created_at: DateTime<Utc>,
}

/// Output of one encryption under a specific key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encryption {
    pub key_id: Uuid,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Plaintext, type-specific columns stored beside the encrypted payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttributes {
    pub ca_name: Option<String>,
    pub certificate: Option<String>,
    pub ca: Option<String>,
    pub public_key: Option<String>,
    pub username: Option<String>,
    pub salt: Option<String>,
}

/// One persisted write of a credential.
///
/// Everything except the encryption columns and `updated_at` is fixed at
/// creation; rotation rewrites those in place.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialVersion {
    pub uuid: Uuid,
    pub name: CredentialName,
    pub credential_type: CredentialType,
    pub key_id: Uuid,
    pub encrypted_value: Vec<u8>,
    pub nonce: Vec<u8>,
    pub encrypted_generation_parameters: Option<Vec<u8>>,
    pub generation_parameters_nonce: Option<Vec<u8>>,
    pub attributes: CredentialAttributes,
    pub version_created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVersion")
            .field("uuid", &self.uuid)
            .field("name", &self.name.name)
            .field("credential_type", &self.credential_type)
            .field("key_id", &self.key_id)
            .field("encrypted_value", &format_args!("[{} bytes]", self.encrypted_value.len()))
            .field("has_generation_parameters", &self.encrypted_generation_parameters.is_some())
            .field("version_created_at", &self.version_created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl CredentialVersion {
    pub fn name(&self) -> &str {
        &self.name.name
    }
}
