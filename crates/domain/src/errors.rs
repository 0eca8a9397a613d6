//! Error types used throughout the credential store
//!
//! Every variant maps to a stable reason code (see [`codes`]) so that callers
//! can render consistent responses without inspecting messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable, enumerable reason codes surfaced to callers.
pub mod codes {
    pub const CREDENTIAL_INVALID_ACCESS: &str = "error.credential.invalid_access";
    pub const CREDENTIAL_ALREADY_EXISTS: &str = "error.credential.already_exists";
    pub const RESOURCE_NOT_FOUND: &str = "error.resource_not_found";
    pub const ACL_LACKS_CREDENTIAL_WRITE: &str = "error.acl.lacks_credential_write";
    pub const TYPE_MISMATCH: &str = "error.type_mismatch";
    pub const MISSING_NAME: &str = "error.missing_name";
    pub const INVALID_NAME: &str = "error.invalid_name";
    pub const MISSING_ACES: &str = "error.permission.missing_aces";
    pub const INVALID_OPERATION: &str = "error.permission.invalid_operation";
    pub const MISSING_CERTIFICATE_PARAMETERS: &str = "error.missing_certificate_parameters";
    pub const MISSING_SIGNING_CA: &str = "error.missing_signing_ca";
    pub const CA_AND_SELF_SIGN: &str = "error.ca_and_self_sign";
    pub const INVALID_KEY_LENGTH: &str = "error.invalid_key_length";
    pub const INVALID_ALTERNATE_NAME: &str = "error.invalid_alternate_name";
    pub const INVALID_EXTENDED_KEY_USAGE: &str = "error.invalid_extended_key_usage";
    pub const INVALID_KEY_USAGE: &str = "error.invalid_key_usage";
    pub const INVALID_DURATION: &str = "error.invalid_duration";
    pub const NOT_A_CA_NAME: &str = "error.not_a_ca_name";
    pub const CANNOT_REGENERATE: &str = "error.cannot_regenerate_non_generated_credential";
    pub const MISSING_ACTIVE_KEY: &str = "error.missing_active_key";
    pub const TOO_MANY_ACTIVE_KEYS: &str = "error.too_many_active_keys";
    pub const UNKNOWN_CREDENTIAL_TYPE: &str = "error.unknown_credential_type";
    pub const UNKNOWN_KEY: &str = "error.unknown_key";
    pub const INVALID_PASSWORD_LENGTH: &str = "error.invalid_password_length";
    pub const EXCLUDES_ALL_CHARSETS: &str = "error.excludes_all_charsets";
    pub const INVALID_JSON_VALUE: &str = "error.invalid_json_value";
    pub const INVALID_CONFIGURATION: &str = "error.invalid_configuration";
    pub const DATABASE: &str = "error.database";
    pub const SECURITY: &str = "error.security";
    pub const INTERNAL: &str = "error.internal";
}

/// Main error type for the credential store
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CredStoreError {
    /// Absent resource, or read access denied. The two are never told apart.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {code}")]
    PermissionDenied { code: String, credential: Option<String> },

    /// A concurrent writer created the name first; nothing was written.
    #[error("Conflict on '{credential}': {code}")]
    Conflict { code: String, credential: String },

    #[error("Validation failed: {code}")]
    Validation { code: String, value: Option<String> },

    #[error("Type mismatch: stored credential is '{existing}', request was '{requested}'")]
    TypeMismatch { existing: String, requested: String },

    #[error("No configured key can decrypt data encrypted under key {0}")]
    UnknownKey(Uuid),

    #[error("Configuration error: {message}")]
    Config { code: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CredStoreError {
    pub fn not_found(code: &str) -> Self {
        Self::NotFound(code.to_string())
    }

    pub fn permission_denied(code: &str) -> Self {
        Self::PermissionDenied { code: code.to_string(), credential: None }
    }

    /// Denial that names the credential the caller already knows about.
    pub fn permission_denied_on(code: &str, credential: impl Into<String>) -> Self {
        Self::PermissionDenied { code: code.to_string(), credential: Some(credential.into()) }
    }

    pub fn conflict(code: &str, credential: impl Into<String>) -> Self {
        Self::Conflict { code: code.to_string(), credential: credential.into() }
    }

    pub fn validation(code: &str) -> Self {
        Self::Validation { code: code.to_string(), value: None }
    }

    pub fn validation_with_value(code: &str, value: impl Into<String>) -> Self {
        Self::Validation { code: code.to_string(), value: Some(value.into()) }
    }

    /// Generic configuration error with the default reason code.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { code: codes::INVALID_CONFIGURATION.to_string(), message: message.into() }
    }

    pub fn config_with_code(code: &str, message: impl Into<String>) -> Self {
        Self::Config { code: code.to_string(), message: message.into() }
    }

    /// Machine-readable reason code for this error.
    pub fn reason_code(&self) -> &str {
        match self {
            Self::NotFound(code)
            | Self::PermissionDenied { code, .. }
            | Self::Conflict { code, .. }
            | Self::Validation { code, .. }
            | Self::Config { code, .. } => code,
            Self::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            Self::UnknownKey(_) => codes::UNKNOWN_KEY,
            Self::Database(_) => codes::DATABASE,
            Self::Security(_) => codes::SECURITY,
            Self::Internal(_) => codes::INTERNAL,
        }
    }
}

/// Result type alias for credential store operations
pub type Result<T> = std::result::Result<T, CredStoreError>;
