//! Deterministic stand-ins for key pair generation and X.509 encoding

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use credstore_core::certificate::CertificateParameters;
use credstore_core::{CertificateCodec, KeyPairGenerator};
use credstore_domain::{
    CertificateValue, CredStoreError, KeyPairParameters, KeyPairValue, ParsedCertificate,
    Result as DomainResult,
};
use serde::{Deserialize, Serialize};

const BEGIN: &str = "-----BEGIN FAKE CERTIFICATE-----\n";
const END: &str = "\n-----END FAKE CERTIFICATE-----\n";

/// Key pairs numbered by generation order.
#[derive(Default, Clone)]
pub struct FakeKeyPairGenerator {
    counter: Arc<AtomicU64>,
}

impl FakeKeyPairGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generated(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl KeyPairGenerator for FakeKeyPairGenerator {
    async fn generate_rsa(&self, parameters: &KeyPairParameters) -> DomainResult<KeyPairValue> {
        let n = self.next();
        Ok(KeyPairValue {
            public_key: pem("PUBLIC KEY", &format!("rsa-{}-{n}", parameters.key_length)),
            private_key: pem("RSA PRIVATE KEY", &format!("rsa-{n}")),
            public_key_fingerprint: None,
        })
    }

    async fn generate_ssh(&self, parameters: &KeyPairParameters) -> DomainResult<KeyPairValue> {
        let n = self.next();
        let comment = parameters.ssh_comment.as_deref().unwrap_or_default();
        Ok(KeyPairValue {
            public_key: format!("ssh-rsa {} {comment}", STANDARD.encode(format!("ssh-rsa-{n}")))
                .trim_end()
                .to_string(),
            private_key: pem("RSA PRIVATE KEY", &format!("ssh-{n}")),
            public_key_fingerprint: None,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FakeCertificate {
    parsed: ParsedCertificate,
    issuer: Option<String>,
    serial: u64,
}

/// Encodes the signing parameters as JSON between PEM-like markers.
#[derive(Default, Clone)]
pub struct FakeCertificateCodec {
    serial: Arc<AtomicU64>,
}

impl FakeCertificateCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Common name of the certificate that signed `pem`.
    pub fn issuer_of(pem: &str) -> Option<String> {
        decode(pem).ok().and_then(|c| c.issuer)
    }
}

fn pem(label: &str, body: &str) -> String {
    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}

fn decode(pem: &str) -> DomainResult<FakeCertificate> {
    let body = pem
        .strip_prefix(BEGIN)
        .and_then(|rest| rest.strip_suffix(END))
        .ok_or_else(|| CredStoreError::validation("invalid_certificate"))?;
    serde_json::from_str(body)
        .map_err(|e| CredStoreError::validation_with_value("invalid_certificate", e.to_string()))
}

#[async_trait]
impl CertificateCodec for FakeCertificateCodec {
    fn parse(&self, certificate_pem: &str) -> DomainResult<ParsedCertificate> {
        decode(certificate_pem).map(|c| c.parsed)
    }

    async fn sign(
        &self,
        parameters: &CertificateParameters,
        _key_pair: &KeyPairValue,
        issuer: Option<&CertificateValue>,
    ) -> DomainResult<String> {
        let issuer = match issuer {
            Some(ca) => decode(&ca.certificate)?.parsed.subject.common_name,
            None => parameters.subject().common_name.clone(),
        };
        let certificate = FakeCertificate {
            parsed: ParsedCertificate {
                subject: parameters.subject().clone(),
                alternative_names: parameters.alternative_names().to_vec(),
                key_usage: parameters.key_usage().iter().map(ToString::to_string).collect(),
                extended_key_usage: parameters
                    .extended_key_usage()
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                key_length: parameters.key_length(),
                duration_days: parameters.duration_days(),
                self_signed: parameters.is_self_signed(),
                is_ca: parameters.is_ca(),
            },
            issuer,
            serial: self.serial.fetch_add(1, Ordering::SeqCst) + 1,
        };
        let body = serde_json::to_string(&certificate)
            .map_err(|e| CredStoreError::Internal(e.to_string()))?;
        Ok(format!("{BEGIN}{body}{END}"))
    }
}
