//! SQLCipher keying and verification

use rusqlite::Connection;
use tracing::{debug, error};

use super::is_wrong_key_error;
use crate::security::SecureString;
use crate::storage::error::{StorageError, StorageResult};

/// Page-level encryption settings applied to every pooled connection.
#[derive(Clone)]
pub struct SqlCipherConfig {
    pub key: SecureString,
    /// SQLCipher major version compatibility (4)
    pub cipher_compatibility: i32,
    /// PBKDF2 iterations used to stretch `key`
    pub kdf_iter: i32,
    pub cipher_memory_security: bool,
}

impl std::fmt::Debug for SqlCipherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCipherConfig")
            .field("key", &self.key)
            .field("cipher_compatibility", &self.cipher_compatibility)
            .field("kdf_iter", &self.kdf_iter)
            .field("cipher_memory_security", &self.cipher_memory_security)
            .finish()
    }
}

impl SqlCipherConfig {
    pub fn new(key: SecureString) -> Self {
        Self { key, cipher_compatibility: 4, kdf_iter: 256_000, cipher_memory_security: true }
    }

    pub fn with_kdf_iter(mut self, iterations: i32) -> Self {
        self.kdf_iter = iterations;
        self
    }
}

/// Key a freshly opened connection. Must run before any other statement.
pub fn configure_sqlcipher(conn: &Connection, config: &SqlCipherConfig) -> StorageResult<()> {
    conn.pragma_update(None, "key", config.key.expose()).map_err(|e| {
        error!(error = %e, "SQLCipher key setup failed");
        if is_wrong_key_error(&e.to_string()) {
            StorageError::WrongKeyOrNotEncrypted
        } else {
            StorageError::Encryption(format!("Failed to set encryption key: {e}"))
        }
    })?;

    let memory_security = if config.cipher_memory_security { "ON" } else { "OFF" };
    let settings: [(&str, &dyn rusqlite::ToSql); 3] = [
        ("cipher_compatibility", &config.cipher_compatibility),
        ("kdf_iter", &config.kdf_iter),
        ("cipher_memory_security", &memory_security),
    ];
    for (pragma, value) in settings {
        conn.pragma_update(None, pragma, value).map_err(|e| {
            error!(error = %e, pragma, "Failed to apply SQLCipher pragma");
            StorageError::Encryption(format!("Failed to set {pragma}: {e}"))
        })?;
    }

    debug!("SQLCipher configured");
    Ok(())
}

/// Force a page read so a wrong key fails here rather than on first query.
pub fn verify_encryption(conn: &Connection) -> StorageResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(())).map_err(|e| {
        if is_wrong_key_error(&e.to_string()) {
            error!("Database cannot be opened with the configured key");
            StorageError::WrongKeyOrNotEncrypted
        } else {
            StorageError::from(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn config(key: &str) -> SqlCipherConfig {
        SqlCipherConfig::new(SecureString::new(key.to_string())).with_kdf_iter(4_000)
    }

    #[test]
    fn debug_redacts_key() {
        let rendered = format!("{:?}", config("super-secret-page-key"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("kdf_iter"));
    }

    #[test]
    fn wrong_key_is_detected_on_verify() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cipher.db");

        {
            let conn = Connection::open(&db_path).unwrap();
            configure_sqlcipher(&conn, &config("correct-page-key")).unwrap();
            conn.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY)", []).unwrap();
            verify_encryption(&conn).unwrap();
        }

        let conn = Connection::open(&db_path).unwrap();
        configure_sqlcipher(&conn, &config("another-page-key")).unwrap();
        assert!(matches!(verify_encryption(&conn), Err(StorageError::WrongKeyOrNotEncrypted)));
    }
}
