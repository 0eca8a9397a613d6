//! Encrypted storage primitives

pub mod error;
pub mod sqlcipher;

pub use error::{StorageError, StorageResult};
pub use sqlcipher::{
    SqlCipherConfig, SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig, SqlCipherStatement,
};
