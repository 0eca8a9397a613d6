//! SQLCipher backend: keyed r2d2 pool with per-connection pragmas.

pub mod cipher;
pub mod config;
pub mod connection;
pub mod pool;
pub mod pragmas;

pub use cipher::{configure_sqlcipher, verify_encryption, SqlCipherConfig};
pub use config::SqlCipherPoolConfig;
pub use connection::{SqlCipherConnection, SqlCipherStatement};
pub use pool::{PoolState, SqlCipherPool};
pub use pragmas::apply_connection_pragmas;

/// SQLite reports a wrong page key through several different messages.
pub(crate) fn is_wrong_key_error(message: &str) -> bool {
    let message = message.to_lowercase();
    [
        "file is not a database",
        "file is encrypted",
        "database disk image is malformed",
        "notadb",
        "unsupported file format",
    ]
    .iter()
    .any(|needle| message.contains(needle))
}
