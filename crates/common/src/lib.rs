//! Reusable building blocks shared across the credential store crates.
//!
//! # Feature Tiers
//!
//! - `foundation`: error classification and field validators
//! - `runtime`: AES-256-GCM encryption with Argon2 key derivation
//! - `platform`: secure strings and the SQLCipher connection pool
//! - `observability`: tracing (pulled in by `platform`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod validation;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod crypto;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod security;
#[cfg(feature = "platform")]
pub mod storage;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use crypto::{EncryptedData, EncryptionService};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "platform")]
pub use security::SecureString;
#[cfg(feature = "foundation")]
pub use validation::{DomainNameValidator, FieldValidator, IpValidator, WildcardDomainValidator};
