//! Builds credential variants from stored rows and from new values

use chrono::{DateTime, Duration, DurationRound, Utc};
use credstore_domain::{
    CredStoreError, CredentialAttributes, CredentialName, CredentialType, CredentialValue,
    CredentialVersion, GenerationParameters, Result,
};
use uuid::Uuid;

use super::generator::PasswordGenerator;
use super::variant::{
    CertificateCredential, Credential, JsonCredential, PasswordCredential, RsaCredential,
    SshCredential, UserCredential, ValueCredential,
};
use crate::keys::Encryptor;

/// Dispatch a stored version on its type tag.
pub fn from_stored(version: CredentialVersion) -> Credential {
    match version.credential_type {
        CredentialType::Password => Credential::Password(PasswordCredential::from_version(version)),
        CredentialType::Certificate => {
            Credential::Certificate(CertificateCredential::from_version(version))
        }
        CredentialType::Ssh => Credential::Ssh(SshCredential::from_version(version)),
        CredentialType::Rsa => Credential::Rsa(RsaCredential::from_version(version)),
        CredentialType::Value => Credential::Value(ValueCredential::from_version(version)),
        CredentialType::Json => Credential::Json(JsonCredential::from_version(version)),
        CredentialType::User => Credential::User(UserCredential::from_version(version)),
    }
}

/// Encrypts new values into fresh versions.
#[derive(Debug, Clone)]
pub struct CredentialFactory {
    encryptor: Encryptor,
    passwords: PasswordGenerator,
}

impl CredentialFactory {
    pub fn new(encryptor: Encryptor) -> Self {
        Self { encryptor, passwords: PasswordGenerator::new() }
    }

    pub fn encryptor(&self) -> &Encryptor {
        &self.encryptor
    }

    /// Build an unsaved version of `value`.
    ///
    /// With `existing`, the version joins that credential's name and its
    /// timestamp is placed strictly after the existing one. Otherwise `name`
    /// is validated and a new identity allocated.
    pub fn new_version(
        &self,
        name: &str,
        value: &CredentialValue,
        existing: Option<&Credential>,
        parameters: Option<&GenerationParameters>,
    ) -> Result<Credential> {
        let credential_name = match existing {
            Some(current) => current.version().name.clone(),
            None => CredentialName::parse(name)?,
        };

        let (secret, attributes) = self.split(value)?;
        let sealed = self.encryptor.encrypt(secret.as_bytes())?;

        let sealed_parameters = match stored_parameters(parameters)? {
            Some(json) => Some(self.encryptor.encrypt(json.as_bytes())?),
            None => None,
        };

        let created_at = next_timestamp(existing.map(|c| c.version().version_created_at));
        let version = CredentialVersion {
            uuid: Uuid::new_v4(),
            name: credential_name,
            credential_type: value.credential_type(),
            key_id: sealed.key_id,
            encrypted_value: sealed.ciphertext,
            nonce: sealed.nonce,
            encrypted_generation_parameters: sealed_parameters
                .as_ref()
                .map(|p| p.ciphertext.clone()),
            generation_parameters_nonce: sealed_parameters.map(|p| p.nonce),
            attributes,
            version_created_at: created_at,
            updated_at: created_at,
        };
        Ok(from_stored(version))
    }

    /// Separate the encrypted secret from the plaintext columns.
    fn split(&self, value: &CredentialValue) -> Result<(String, CredentialAttributes)> {
        let mut attributes = CredentialAttributes::default();
        let secret = match value {
            CredentialValue::Password(password) | CredentialValue::Value(password) => {
                password.clone()
            }
            CredentialValue::Json(map) => serde_json::to_string(map).map_err(|e| {
                CredStoreError::Internal(format!("json value failed to serialize: {e}"))
            })?,
            CredentialValue::User(user) => {
                attributes.username = user.username.clone();
                attributes.salt = Some(self.passwords.generate_salt());
                user.password.clone()
            }
            CredentialValue::Certificate(certificate) => {
                attributes.ca = certificate.ca.clone();
                attributes.certificate = Some(certificate.certificate.clone());
                attributes.ca_name =
                    certificate.ca_name.as_deref().map(credstore_domain::normalize_name);
                certificate.private_key.clone()
            }
            CredentialValue::Ssh(pair) | CredentialValue::Rsa(pair) => {
                attributes.public_key = Some(pair.public_key.clone());
                pair.private_key.clone()
            }
        };
        Ok((secret, attributes))
    }
}

/// Serialized parameters kept beside the value; certificates re-derive theirs.
fn stored_parameters(parameters: Option<&GenerationParameters>) -> Result<Option<String>> {
    let json = match parameters {
        Some(GenerationParameters::Password(p) | GenerationParameters::User(p)) => {
            serde_json::to_string(p)
        }
        Some(GenerationParameters::Ssh(p) | GenerationParameters::Rsa(p)) => {
            serde_json::to_string(p)
        }
        Some(GenerationParameters::Certificate(_)) | None => return Ok(None),
    };
    json.map(Some).map_err(|e| {
        CredStoreError::Internal(format!("generation parameters failed to serialize: {e}"))
    })
}

/// Now at microsecond precision, bumped past `previous` when needed.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    let now = now.duration_trunc(Duration::microseconds(1)).unwrap_or(now);
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
