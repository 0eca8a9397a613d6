//! Typed credential variants over a stored version
//!
//! Each variant wraps the persisted [`CredentialVersion`] and decrypts its
//! fields on demand. Nothing decrypted is kept on the variant.

use base64::engine::general_purpose::STANDARD_NO_PAD as BASE64_NO_PAD;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use credstore_domain::{
    CertificateValue, CredStoreError, CredentialType, CredentialValue, CredentialVersion,
    CredentialView, KeyPairParameters, KeyPairValue, Result, StringGenerationParameters,
    UserValue,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::keys::Encryptor;

macro_rules! credential_variant {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            version: CredentialVersion,
        }

        impl $name {
            pub(crate) fn from_version(version: CredentialVersion) -> Self {
                Self { version }
            }

            pub fn version(&self) -> &CredentialVersion {
                &self.version
            }

            fn secret(&self, encryptor: &Encryptor) -> Result<String> {
                encryptor.decrypt_string(
                    self.version.key_id,
                    &self.version.encrypted_value,
                    &self.version.nonce,
                )
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, generated) => {
        credential_variant!($(#[$meta])* $name);

        impl $name {
            fn stored_parameters<P: DeserializeOwned>(
                &self,
                encryptor: &Encryptor,
            ) -> Result<Option<P>> {
                let (Some(ciphertext), Some(nonce)) = (
                    self.version.encrypted_generation_parameters.as_deref(),
                    self.version.generation_parameters_nonce.as_deref(),
                ) else {
                    return Ok(None);
                };
                let json = encryptor.decrypt_string(self.version.key_id, ciphertext, nonce)?;
                serde_json::from_str(&json).map(Some).map_err(|e| {
                    let message = format!("stored generation parameters are corrupt: {e}");
                    CredStoreError::Internal(message)
                })
            }
        }
    };
}

credential_variant!(PasswordCredential, generated);
credential_variant!(CertificateCredential);
credential_variant!(SshCredential, generated);
credential_variant!(RsaCredential, generated);
credential_variant!(ValueCredential);
credential_variant!(JsonCredential);
credential_variant!(UserCredential, generated);

impl PasswordCredential {
    pub fn password(&self, encryptor: &Encryptor) -> Result<String> {
        self.secret(encryptor)
    }

    pub fn generation_parameters(
        &self,
        encryptor: &Encryptor,
    ) -> Result<Option<StringGenerationParameters>> {
        self.stored_parameters(encryptor)
    }
}

impl UserCredential {
    pub fn username(&self) -> Option<&str> {
        self.version.attributes.username.as_deref()
    }

    pub fn salt(&self) -> Option<&str> {
        self.version.attributes.salt.as_deref()
    }

    pub fn password(&self, encryptor: &Encryptor) -> Result<String> {
        self.secret(encryptor)
    }

    /// Hex SHA-256 of salt followed by password.
    pub fn password_hash(&self, encryptor: &Encryptor) -> Result<String> {
        let password = self.password(encryptor)?;
        Ok(salted_hash(self.salt().unwrap_or_default(), &password))
    }

    pub fn generation_parameters(
        &self,
        encryptor: &Encryptor,
    ) -> Result<Option<StringGenerationParameters>> {
        self.stored_parameters(encryptor)
    }
}

impl CertificateCredential {
    pub fn ca(&self) -> Option<&str> {
        self.version.attributes.ca.as_deref()
    }

    pub fn certificate(&self) -> &str {
        self.version.attributes.certificate.as_deref().unwrap_or_default()
    }

    pub fn ca_name(&self) -> Option<&str> {
        self.version.attributes.ca_name.as_deref()
    }

    pub fn private_key(&self, encryptor: &Encryptor) -> Result<String> {
        self.secret(encryptor)
    }
}

impl SshCredential {
    pub fn public_key(&self) -> &str {
        self.version.attributes.public_key.as_deref().unwrap_or_default()
    }

    pub fn private_key(&self, encryptor: &Encryptor) -> Result<String> {
        self.secret(encryptor)
    }

    /// `SHA256` fingerprint of the OpenSSH public key blob, if it parses.
    pub fn fingerprint(&self) -> Option<String> {
        ssh_fingerprint(self.public_key())
    }

    pub fn generation_parameters(
        &self,
        encryptor: &Encryptor,
    ) -> Result<Option<KeyPairParameters>> {
        self.stored_parameters(encryptor)
    }
}

impl RsaCredential {
    pub fn public_key(&self) -> &str {
        self.version.attributes.public_key.as_deref().unwrap_or_default()
    }

    pub fn private_key(&self, encryptor: &Encryptor) -> Result<String> {
        self.secret(encryptor)
    }

    pub fn generation_parameters(
        &self,
        encryptor: &Encryptor,
    ) -> Result<Option<KeyPairParameters>> {
        self.stored_parameters(encryptor)
    }
}

impl ValueCredential {
    pub fn value(&self, encryptor: &Encryptor) -> Result<String> {
        self.secret(encryptor)
    }
}

impl JsonCredential {
    pub fn value(&self, encryptor: &Encryptor) -> Result<Map<String, Value>> {
        let json = self.secret(encryptor)?;
        serde_json::from_str(&json)
            .map_err(|e| CredStoreError::Internal(format!("stored json value is corrupt: {e}")))
    }
}

/// A stored version viewed through its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Password(PasswordCredential),
    Certificate(CertificateCredential),
    Ssh(SshCredential),
    Rsa(RsaCredential),
    Value(ValueCredential),
    Json(JsonCredential),
    User(UserCredential),
}

impl Credential {
    pub fn version(&self) -> &CredentialVersion {
        match self {
            Self::Password(c) => c.version(),
            Self::Certificate(c) => c.version(),
            Self::Ssh(c) => c.version(),
            Self::Rsa(c) => c.version(),
            Self::Value(c) => c.version(),
            Self::Json(c) => c.version(),
            Self::User(c) => c.version(),
        }
    }

    fn version_mut(&mut self) -> &mut CredentialVersion {
        match self {
            Self::Password(c) => &mut c.version,
            Self::Certificate(c) => &mut c.version,
            Self::Ssh(c) => &mut c.version,
            Self::Rsa(c) => &mut c.version,
            Self::Value(c) => &mut c.version,
            Self::Json(c) => &mut c.version,
            Self::User(c) => &mut c.version,
        }
    }

    pub fn into_version(self) -> CredentialVersion {
        match self {
            Self::Password(c) => c.version,
            Self::Certificate(c) => c.version,
            Self::Ssh(c) => c.version,
            Self::Rsa(c) => c.version,
            Self::Value(c) => c.version,
            Self::Json(c) => c.version,
            Self::User(c) => c.version,
        }
    }

    pub fn credential_type(&self) -> CredentialType {
        self.version().credential_type
    }

    pub fn name(&self) -> &str {
        self.version().name()
    }

    /// Decrypt into the caller-facing value.
    pub fn value(&self, encryptor: &Encryptor) -> Result<CredentialValue> {
        Ok(match self {
            Self::Password(c) => CredentialValue::Password(c.password(encryptor)?),
            Self::Value(c) => CredentialValue::Value(c.value(encryptor)?),
            Self::Json(c) => CredentialValue::Json(c.value(encryptor)?),
            Self::User(c) => {
                let password = c.password(encryptor)?;
                CredentialValue::User(UserValue {
                    username: c.username().map(str::to_string),
                    password_hash: Some(salted_hash(c.salt().unwrap_or_default(), &password)),
                    password,
                })
            }
            Self::Certificate(c) => CredentialValue::Certificate(CertificateValue {
                ca: c.ca().map(str::to_string),
                certificate: c.certificate().to_string(),
                private_key: c.private_key(encryptor)?,
                ca_name: c.ca_name().map(str::to_string),
            }),
            Self::Ssh(c) => CredentialValue::Ssh(KeyPairValue {
                public_key: c.public_key().to_string(),
                private_key: c.private_key(encryptor)?,
                public_key_fingerprint: c.fingerprint(),
            }),
            Self::Rsa(c) => CredentialValue::Rsa(KeyPairValue {
                public_key: c.public_key().to_string(),
                private_key: c.private_key(encryptor)?,
                public_key_fingerprint: None,
            }),
        })
    }

    pub fn view(&self, encryptor: &Encryptor) -> Result<CredentialView> {
        let version = self.version();
        Ok(CredentialView {
            uuid: version.uuid,
            name: version.name().to_string(),
            version_created_at: version.version_created_at,
            value: self.value(encryptor)?,
        })
    }

    /// Re-encrypt every encrypted field under the active key, in place.
    ///
    /// `updated_at` moves forward; `version_created_at` and the row identity
    /// stay as they were.
    pub fn rotate(&mut self, encryptor: &Encryptor) -> Result<()> {
        let version = self.version_mut();
        let old_key = version.key_id;

        let value = encryptor.decrypt(old_key, &version.encrypted_value, &version.nonce)?;
        let parameters = match (
            version.encrypted_generation_parameters.as_deref(),
            version.generation_parameters_nonce.as_deref(),
        ) {
            (Some(ciphertext), Some(nonce)) => Some(encryptor.decrypt(old_key, ciphertext, nonce)?),
            _ => None,
        };

        let sealed = encryptor.encrypt(&value)?;
        let sealed_parameters = parameters.map(|p| encryptor.encrypt(&p)).transpose()?;

        version.key_id = sealed.key_id;
        version.encrypted_value = sealed.ciphertext;
        version.nonce = sealed.nonce;
        version.encrypted_generation_parameters =
            sealed_parameters.as_ref().map(|p| p.ciphertext.clone());
        version.generation_parameters_nonce = sealed_parameters.map(|p| p.nonce);
        // Strictly later even when the clock has not ticked at storage precision.
        version.updated_at = Utc::now().max(version.updated_at + Duration::microseconds(1));
        Ok(())
    }
}

pub(crate) fn salted_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// `SHA256:<base64>` over the decoded key blob of an OpenSSH public key.
pub(crate) fn ssh_fingerprint(public_key: &str) -> Option<String> {
    let blob = public_key.split_whitespace().nth(1)?;
    let decoded = BASE64.decode(blob).ok()?;
    Some(format!("SHA256:{}", BASE64_NO_PAD.encode(Sha256::digest(decoded))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salted_hash_depends_on_salt() {
        let one = salted_hash("salt-a", "pw");
        assert_eq!(one.len(), 64);
        assert_eq!(one, salted_hash("salt-a", "pw"));
        assert_ne!(one, salted_hash("salt-b", "pw"));
    }

    #[test]
    fn ssh_fingerprint_reads_key_blob() {
        let blob = BASE64.encode(b"ssh-rsa-key-bytes");
        let fingerprint = ssh_fingerprint(&format!("ssh-rsa {blob} ops@host")).unwrap();
        assert!(fingerprint.starts_with("SHA256:"));
        assert!(!fingerprint.ends_with('='));

        assert_eq!(ssh_fingerprint("not-a-key"), None);
        assert_eq!(ssh_fingerprint("ssh-rsa ***"), None);
    }
}
