//! # CredStore Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLCipher repositories for credentials, access entries and key canaries
//! - Configuration loading from `CREDSTORE_*` variables or TOML/JSON files
//! - Key material resolution, including the OS keyring
//! - Tracing setup and the tracing-backed audit sink
//! - [`bootstrap::Bootstrap`], which wires all of the above into a vault
//!
//! ## Architecture
//! - Implements traits defined in `credstore-core`
//! - Depends on `credstore-common`, `credstore-domain` and `credstore-core`
//! - Contains all "impure" code (I/O, keyring, global subscriber)

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod errors;
pub mod key_manager;
pub mod observability;

// Re-export commonly used items
pub use bootstrap::{AppContext, Bootstrap};
pub use database::*;
pub use errors::InfraError;
pub use key_manager::KeyManager;
pub use observability::{init_tracing, TracingAuditSink};
