//! Parameters for server-side credential generation

use serde::{Deserialize, Serialize};

use super::certificate::CertificateGenerationParameters;
use super::credential::CredentialType;
use crate::constants::{
    DEFAULT_KEY_LENGTH, DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
    SPECIAL_CHARACTERS, VALID_KEY_LENGTHS,
};
use crate::errors::{codes, CredStoreError, Result};

/// Character-set and length rules for generated passwords.
///
/// Stored encrypted next to password and user credentials so that a
/// regenerate reproduces the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringGenerationParameters {
    pub length: usize,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
    pub exclude_number: bool,
    pub include_special: bool,
    /// Only meaningful for `user` credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Default for StringGenerationParameters {
    fn default() -> Self {
        Self {
            length: DEFAULT_PASSWORD_LENGTH,
            exclude_lower: false,
            exclude_upper: false,
            exclude_number: false,
            include_special: false,
            username: None,
        }
    }
}

impl StringGenerationParameters {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&self.length) {
            return Err(CredStoreError::validation_with_value(
                codes::INVALID_PASSWORD_LENGTH,
                self.length.to_string(),
            ));
        }
        if self.exclude_lower && self.exclude_upper && self.exclude_number && !self.include_special
        {
            return Err(CredStoreError::validation(codes::EXCLUDES_ALL_CHARSETS));
        }
        Ok(())
    }

    /// Best-effort reconstruction of the rules that produced `password`.
    ///
    /// Used when an older credential carries no stored parameters.
    pub fn infer_from(password: &str) -> Self {
        Self {
            length: password.chars().count(),
            exclude_lower: !password.chars().any(|c| c.is_ascii_lowercase()),
            exclude_upper: !password.chars().any(|c| c.is_ascii_uppercase()),
            exclude_number: !password.chars().any(|c| c.is_ascii_digit()),
            include_special: password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
            username: None,
        }
    }
}

/// Key length for `ssh` and `rsa` generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPairParameters {
    pub key_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_comment: Option<String>,
}

impl Default for KeyPairParameters {
    fn default() -> Self {
        Self { key_length: DEFAULT_KEY_LENGTH, ssh_comment: None }
    }
}

impl KeyPairParameters {
    pub fn validate(&self) -> Result<()> {
        if VALID_KEY_LENGTHS.contains(&self.key_length) {
            Ok(())
        } else {
            Err(CredStoreError::validation_with_value(
                codes::INVALID_KEY_LENGTH,
                self.key_length.to_string(),
            ))
        }
    }
}

/// A generation request for one of the generable credential types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "lowercase")]
pub enum GenerationParameters {
    Password(StringGenerationParameters),
    User(StringGenerationParameters),
    Ssh(KeyPairParameters),
    Rsa(KeyPairParameters),
    Certificate(CertificateGenerationParameters),
}

impl GenerationParameters {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Password(_) => CredentialType::Password,
            Self::User(_) => CredentialType::User,
            Self::Ssh(_) => CredentialType::Ssh,
            Self::Rsa(_) => CredentialType::Rsa,
            Self::Certificate(_) => CredentialType::Certificate,
        }
    }
}
