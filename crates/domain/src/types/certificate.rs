//! Certificate request and parsed-certificate shapes
//!
//! Byte-level X.509 encoding lives behind the certificate codec port; these
//! types only carry the fields the store reasons about.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DURATION_DAYS, DEFAULT_KEY_LENGTH};

/// Distinguished-name fields of a certificate subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectName {
    pub common_name: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl SubjectName {
    /// True when at least one field carries a non-empty value.
    pub fn has_any_field(&self) -> bool {
        [
            &self.common_name,
            &self.organization,
            &self.organization_unit,
            &self.locality,
            &self.state,
            &self.country,
        ]
        .into_iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Raw certificate generation request as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateGenerationParameters {
    #[serde(flatten)]
    pub subject: SubjectName,
    pub alternative_names: Vec<String>,
    pub key_usage: Vec<String>,
    pub extended_key_usage: Vec<String>,
    pub key_length: u32,
    pub duration: u32,
    pub self_signed: bool,
    pub is_ca: bool,
    /// Name of the CA credential that signs this certificate.
    pub ca: Option<String>,
}

impl Default for CertificateGenerationParameters {
    fn default() -> Self {
        Self {
            subject: SubjectName::default(),
            alternative_names: Vec::new(),
            key_usage: Vec::new(),
            extended_key_usage: Vec::new(),
            key_length: DEFAULT_KEY_LENGTH,
            duration: DEFAULT_DURATION_DAYS,
            self_signed: false,
            is_ca: false,
            ca: None,
        }
    }
}

/// Fields read back out of an existing certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCertificate {
    pub subject: SubjectName,
    pub alternative_names: Vec<String>,
    pub key_usage: Vec<String>,
    pub extended_key_usage: Vec<String>,
    pub key_length: u32,
    pub duration_days: u32,
    pub self_signed: bool,
    pub is_ca: bool,
}
