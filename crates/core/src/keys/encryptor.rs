//! Encrypt under the active key, decrypt under whichever key sealed the data

use std::sync::Arc;

use credstore_domain::{CredStoreError, Encryption, Result};
use uuid::Uuid;

use super::table::KeyTable;

#[derive(Debug, Clone)]
pub struct Encryptor {
    table: Arc<KeyTable>,
}

impl Encryptor {
    pub fn new(table: Arc<KeyTable>) -> Self {
        Self { table }
    }

    pub fn key_table(&self) -> &KeyTable {
        &self.table
    }

    pub fn active_key_id(&self) -> Uuid {
        self.table.active_key_id()
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Encryption> {
        let sealed = self
            .table
            .active_cipher()
            .encrypt(plaintext)
            .map_err(|e| CredStoreError::Security(e.to_string()))?;
        Ok(Encryption {
            key_id: self.table.active_key_id(),
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
        })
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<Encryption> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Fails with [`CredStoreError::UnknownKey`] when `key_id` has no cipher.
    pub fn decrypt(&self, key_id: Uuid, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.table.cipher(key_id).ok_or(CredStoreError::UnknownKey(key_id))?;
        cipher.decrypt(ciphertext, nonce).map_err(|e| CredStoreError::Security(e.to_string()))
    }

    pub fn decrypt_string(&self, key_id: Uuid, ciphertext: &[u8], nonce: &[u8]) -> Result<String> {
        let bytes = self.decrypt(key_id, ciphertext, nonce)?;
        String::from_utf8(bytes)
            .map_err(|_| CredStoreError::Security("decrypted value is not valid UTF-8".into()))
    }
}
