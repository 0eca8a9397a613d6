//! Certificate authority logic
//!
//! Validates certificate parameters, resolves signing CAs by name and
//! re-issues certificates. X.509 encoding stays behind [`CertificateCodec`].

pub mod generator;
pub mod params;
pub mod ports;
pub mod regenerate;

pub use generator::CertificateGenerator;
pub use params::{CertificateParameters, ExtendedKeyUsage, KeyUsage};
pub use ports::CertificateCodec;
pub use regenerate::{BulkRegenerateResult, CertificateRegenerator};
