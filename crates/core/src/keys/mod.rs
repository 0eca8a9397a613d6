//! Encryption keys
//!
//! Configured key material is resolved once at startup into an immutable
//! [`KeyTable`]; the [`Encryptor`] wraps that table for every read and
//! write.

pub mod encryptor;
pub mod material;
pub mod ports;
pub mod registry;
pub mod table;

pub use encryptor::Encryptor;
pub use material::{ConfiguredKey, KeyMaterial};
pub use ports::CanaryRepository;
pub use registry::KeyRegistry;
pub use table::KeyTable;
