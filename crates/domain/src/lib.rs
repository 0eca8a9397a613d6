//! # CredStore Domain
//!
//! Business domain types and models for the credential store.
//!
//! This crate contains:
//! - Credential identity, version and value types
//! - Permission operations and access entries
//! - Encryption key canaries and audit records
//! - Domain error types, reason codes and the `Result` alias
//! - Configuration structures
//!
//! ## Architecture
//! - No dependencies on other CredStore crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
