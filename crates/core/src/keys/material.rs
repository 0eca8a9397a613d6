//! Configured key material

use credstore_common::crypto::KEY_LEN;
use credstore_common::{EncryptionService, SecureString};
use credstore_domain::{CredStoreError, Result};

/// Secret material for one configured key.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// 32 raw bytes, hex encoded.
    Hex(SecureString),
    /// Passphrase; the Argon2 salt is recorded on the key's canary.
    Password(SecureString),
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hex(_) => f.write_str("KeyMaterial::Hex([REDACTED])"),
            Self::Password(_) => f.write_str("KeyMaterial::Password([REDACTED])"),
        }
    }
}

impl KeyMaterial {
    pub fn is_password(&self) -> bool {
        matches!(self, Self::Password(_))
    }

    /// Build the cipher for this material.
    ///
    /// `salt` is only consulted for password material; `None` draws a fresh
    /// salt.
    pub fn cipher(&self, salt: Option<&str>) -> Result<EncryptionService> {
        let service = match self {
            Self::Hex(encoded) => {
                let bytes = hex::decode(encoded.expose().trim()).map_err(|e| {
                    CredStoreError::config(format!("encryption key is not valid hex: {e}"))
                })?;
                if bytes.len() != KEY_LEN {
                    return Err(CredStoreError::config(format!(
                        "encryption key must decode to {KEY_LEN} bytes, got {}",
                        bytes.len()
                    )));
                }
                EncryptionService::new(bytes)
            }
            Self::Password(password) => {
                EncryptionService::from_password_with_salt(password.expose(), salt)
            }
        };
        service.map_err(|e| CredStoreError::Security(e.to_string()))
    }
}

/// One entry of the ordered key list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredKey {
    pub material: KeyMaterial,
    pub active: bool,
}

impl ConfiguredKey {
    pub fn new(material: KeyMaterial, active: bool) -> Self {
        Self { material, active }
    }
}
