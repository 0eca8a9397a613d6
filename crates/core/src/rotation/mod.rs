//! Re-encryption of stored credentials under the active key

pub mod engine;

pub use engine::{RotationEngine, RotationReport};
