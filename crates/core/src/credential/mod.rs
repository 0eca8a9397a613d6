//! Credentials
//!
//! Typed variants over stored versions, the factory that builds them, the
//! data store and the permission-aware service on top.

pub mod factory;
pub mod generator;
pub mod ports;
pub mod service;
pub mod store;
pub mod variant;

pub use factory::{from_stored, CredentialFactory};
pub use generator::{KeyPairGenerator, PasswordGenerator};
pub use ports::CredentialRepository;
pub use service::{CredentialService, GenerateRequest, SetRequest};
pub use store::CredentialStore;
pub use variant::Credential;
