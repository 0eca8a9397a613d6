//! AES-256-GCM encryption with optional Argon2 key derivation.
//!
//! ```rust
//! use credstore_common::crypto::EncryptionService;
//!
//! let service = EncryptionService::new(EncryptionService::generate_key())?;
//! let sealed = service.encrypt(b"sensitive data")?;
//! let opened = service.decrypt(&sealed.ciphertext, &sealed.nonce)?;
//! assert_eq!(opened, b"sensitive data");
//! # Ok::<(), credstore_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::SaltString;
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{CommonError, CommonResult};

/// Raw key length in bytes.
pub const KEY_LEN: usize = 32;
/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Ciphertext together with the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// AES-GCM cipher bound to one key.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
    password_salt: Option<String>,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("password_derived", &self.password_salt.is_some())
            .finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::crypto(format!(
                "Encryption key must be exactly {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CommonError::crypto(format!("Failed to create encryption cipher: {e}")))?;

        Ok(Self { key, cipher, password_salt: None })
    }

    /// Derive a key from `password` with Argon2.
    ///
    /// Passing the salt recorded for an earlier derivation reproduces the
    /// same key; `None` draws a fresh salt.
    pub fn from_password_with_salt(password: &str, salt: Option<&str>) -> CommonResult<Self> {
        let salt = match salt {
            Some(existing) => SaltString::from_b64(existing)
                .map_err(|e| CommonError::crypto(format!("Invalid password salt: {e}")))?,
            None => SaltString::generate(OsRng),
        };

        let mut key = vec![0u8; KEY_LEN];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt.as_str().as_bytes(), &mut key)
            .map_err(|e| CommonError::crypto(format!("Key derivation failed: {e}")))?;

        let mut service = Self::new(key)?;
        service.password_salt = Some(salt.as_str().to_string());
        Ok(service)
    }

    /// Salt used to derive this key, for password-derived services.
    pub fn password_salt(&self) -> Option<&str> {
        self.password_salt.as_deref()
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Seal `data` under a fresh random nonce.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), data)
            .map_err(|e| CommonError::crypto(format!("Encryption failed: {e}")))?;

        Ok(EncryptedData { nonce: nonce.to_vec(), ciphertext })
    }

    /// Open `ciphertext`. Fails when the key is wrong or the data was altered.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> CommonResult<Vec<u8>> {
        let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| {
            CommonError::crypto(format!("Nonce must be exactly {NONCE_LEN} bytes"))
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce), ciphertext)
            .map_err(|e| CommonError::crypto(format!("Decryption failed: {e}")))
    }

    /// Short, non-reversible identifier for log lines.
    pub fn key_fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.key);
        BASE64.encode(&digest[..8])
    }
}
