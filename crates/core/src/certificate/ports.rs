//! Port interface for X.509 encoding

use async_trait::async_trait;
use credstore_domain::{CertificateValue, KeyPairValue, ParsedCertificate, Result};

use super::params::CertificateParameters;

/// Certificate parsing and signing.
#[async_trait]
pub trait CertificateCodec: Send + Sync {
    /// Read the fields the store re-issues from a PEM certificate.
    fn parse(&self, certificate_pem: &str) -> Result<ParsedCertificate>;

    /// Sign a certificate for `key_pair`.
    ///
    /// `issuer` is `None` for self-signed certificates; otherwise it carries
    /// the CA's certificate and private key. Returns the certificate PEM.
    async fn sign(
        &self,
        parameters: &CertificateParameters,
        key_pair: &KeyPairValue,
        issuer: Option<&CertificateValue>,
    ) -> Result<String>;
}
