//! Symmetric encryption primitives.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService, KEY_LEN, NONCE_LEN};
