//! Validated certificate parameters

use credstore_common::validation::any_valid;
use credstore_common::{DomainNameValidator, FieldValidator, IpValidator, WildcardDomainValidator};
use credstore_domain::constants::{MAX_DURATION_DAYS, MIN_DURATION_DAYS, VALID_KEY_LENGTHS};
use credstore_domain::{
    codes, impl_domain_status_conversions, normalize_name, CertificateGenerationParameters,
    CredStoreError, ParsedCertificate, Result, SubjectName,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyUsage {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl_domain_status_conversions!(KeyUsage {
    DigitalSignature => "digital_signature",
    NonRepudiation => "non_repudiation",
    KeyEncipherment => "key_encipherment",
    DataEncipherment => "data_encipherment",
    KeyAgreement => "key_agreement",
    KeyCertSign => "key_cert_sign",
    CrlSign => "crl_sign",
    EncipherOnly => "encipher_only",
    DecipherOnly => "decipher_only",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtendedKeyUsage {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    Timestamping,
}

impl_domain_status_conversions!(ExtendedKeyUsage {
    ServerAuth => "server_auth",
    ClientAuth => "client_auth",
    CodeSigning => "code_signing",
    EmailProtection => "email_protection",
    Timestamping => "timestamping",
});

/// Parameters accepted by the certificate codec.
///
/// Only constructible through validation, so a value of this type always
/// satisfies the signing rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateParameters {
    subject: SubjectName,
    alternative_names: Vec<String>,
    key_usage: Vec<KeyUsage>,
    extended_key_usage: Vec<ExtendedKeyUsage>,
    key_length: u32,
    duration_days: u32,
    self_signed: bool,
    is_ca: bool,
    ca_name: Option<String>,
}

impl CertificateParameters {
    /// Validate a generation request.
    pub fn from_request(request: CertificateGenerationParameters) -> Result<Self> {
        Self::validated(Unchecked {
            subject: request.subject,
            alternative_names: request.alternative_names,
            key_usage: request.key_usage,
            extended_key_usage: request.extended_key_usage,
            key_length: request.key_length,
            duration_days: request.duration,
            self_signed: request.self_signed,
            is_ca: request.is_ca,
            ca_name: request.ca,
        })
    }

    /// Parameters for re-issuing `parsed` under `ca_name`.
    ///
    /// `None` re-issues a self-signed certificate.
    pub fn from_parsed(parsed: ParsedCertificate, ca_name: Option<&str>) -> Result<Self> {
        Self::validated(Unchecked {
            subject: parsed.subject,
            alternative_names: parsed.alternative_names,
            key_usage: parsed.key_usage,
            extended_key_usage: parsed.extended_key_usage,
            key_length: parsed.key_length,
            duration_days: parsed.duration_days,
            self_signed: ca_name.is_none() && (parsed.self_signed || parsed.is_ca),
            is_ca: parsed.is_ca,
            ca_name: ca_name.map(str::to_string),
        })
    }

    fn validated(mut raw: Unchecked) -> Result<Self> {
        raw.ca_name = raw.ca_name.filter(|n| !n.trim().is_empty()).map(|n| normalize_name(&n));

        if raw.is_ca && raw.ca_name.is_none() {
            raw.self_signed = true;
        }
        if !raw.subject.has_any_field() {
            return Err(CredStoreError::validation(codes::MISSING_CERTIFICATE_PARAMETERS));
        }
        if raw.ca_name.is_none() && !raw.self_signed {
            return Err(CredStoreError::validation(codes::MISSING_SIGNING_CA));
        }
        if raw.ca_name.is_some() && raw.self_signed {
            return Err(CredStoreError::validation(codes::CA_AND_SELF_SIGN));
        }
        if !VALID_KEY_LENGTHS.contains(&raw.key_length) {
            return Err(CredStoreError::validation_with_value(
                codes::INVALID_KEY_LENGTH,
                raw.key_length.to_string(),
            ));
        }

        let ip = IpValidator::new();
        let domain = DomainNameValidator::new();
        let wildcard = WildcardDomainValidator::new();
        let san_validators: [&dyn FieldValidator<str>; 3] = [&ip, &domain, &wildcard];
        let invalid = |name: &&String| !any_valid(name.as_str(), &san_validators);
        if let Some(bad) = raw.alternative_names.iter().find(invalid) {
            return Err(CredStoreError::validation_with_value(codes::INVALID_ALTERNATE_NAME, bad));
        }

        let extended_key_usage =
            parse_all(&raw.extended_key_usage, codes::INVALID_EXTENDED_KEY_USAGE)?;
        let key_usage = parse_all(&raw.key_usage, codes::INVALID_KEY_USAGE)?;

        if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&raw.duration_days) {
            return Err(CredStoreError::validation_with_value(
                codes::INVALID_DURATION,
                raw.duration_days.to_string(),
            ));
        }

        Ok(Self {
            subject: raw.subject,
            alternative_names: raw.alternative_names,
            key_usage,
            extended_key_usage,
            key_length: raw.key_length,
            duration_days: raw.duration_days,
            self_signed: raw.self_signed,
            is_ca: raw.is_ca,
            ca_name: raw.ca_name,
        })
    }

    pub fn subject(&self) -> &SubjectName {
        &self.subject
    }

    pub fn alternative_names(&self) -> &[String] {
        &self.alternative_names
    }

    pub fn key_usage(&self) -> &[KeyUsage] {
        &self.key_usage
    }

    pub fn extended_key_usage(&self) -> &[ExtendedKeyUsage] {
        &self.extended_key_usage
    }

    pub fn key_length(&self) -> u32 {
        self.key_length
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn is_self_signed(&self) -> bool {
        self.self_signed
    }

    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    pub fn ca_name(&self) -> Option<&str> {
        self.ca_name.as_deref()
    }
}

struct Unchecked {
    subject: SubjectName,
    alternative_names: Vec<String>,
    key_usage: Vec<String>,
    extended_key_usage: Vec<String>,
    key_length: u32,
    duration_days: u32,
    self_signed: bool,
    is_ca: bool,
    ca_name: Option<String>,
}

fn parse_all<T: std::str::FromStr>(values: &[String], code: &str) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| {
            v.parse::<T>().map_err(|_| CredStoreError::validation_with_value(code, v.as_str()))
        })
        .collect()
}
