//! Encryption key canary

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Small persisted record proving which configured key owns a stored key id.
///
/// The canary's `uuid` is the key id stamped on every credential version
/// encrypted under that key. `salt` is set for password-derived keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeyCanary {
    pub uuid: Uuid,
    pub encrypted_value: Vec<u8>,
    pub nonce: Vec<u8>,
    pub salt: Option<String>,
}
