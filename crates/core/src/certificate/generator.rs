//! Certificate generation and CA resolution

use std::sync::Arc;

use credstore_domain::{
    codes, CertificateValue, CredStoreError, KeyPairParameters, Result,
};
use tracing::debug;

use super::params::CertificateParameters;
use super::ports::CertificateCodec;
use crate::credential::generator::KeyPairGenerator;
use crate::credential::store::CredentialStore;
use crate::credential::variant::Credential;
use crate::keys::Encryptor;

pub struct CertificateGenerator {
    key_pairs: Arc<dyn KeyPairGenerator>,
    codec: Arc<dyn CertificateCodec>,
}

impl CertificateGenerator {
    pub fn new(key_pairs: Arc<dyn KeyPairGenerator>, codec: Arc<dyn CertificateCodec>) -> Self {
        Self { key_pairs, codec }
    }

    pub fn codec(&self) -> &Arc<dyn CertificateCodec> {
        &self.codec
    }

    /// Generate a fresh key pair and certificate.
    ///
    /// `issuer` must be the current value of the CA named in `parameters`
    /// and is ignored for self-signed parameters.
    pub async fn generate(
        &self,
        parameters: &CertificateParameters,
        issuer: Option<&CertificateValue>,
    ) -> Result<CertificateValue> {
        let request = KeyPairParameters { key_length: parameters.key_length(), ssh_comment: None };
        let key_pair = self.key_pairs.generate_rsa(&request).await?;

        if parameters.is_self_signed() {
            let certificate = self.codec.sign(parameters, &key_pair, None).await?;
            return Ok(CertificateValue {
                ca: None,
                certificate,
                private_key: key_pair.private_key,
                ca_name: None,
            });
        }

        let issuer = issuer.ok_or_else(|| CredStoreError::validation(codes::MISSING_SIGNING_CA))?;
        let certificate = self.codec.sign(parameters, &key_pair, Some(issuer)).await?;
        Ok(CertificateValue {
            ca: Some(issuer.certificate.clone()),
            certificate,
            private_key: key_pair.private_key,
            ca_name: parameters.ca_name().map(str::to_string),
        })
    }
}

/// Current value of the CA credential `ca_name`.
///
/// A missing CA is reported like any unreadable credential; a name that
/// holds another credential type is rejected.
pub async fn resolve_ca(
    store: &CredentialStore,
    encryptor: &Encryptor,
    ca_name: &str,
) -> Result<CertificateValue> {
    match store.most_recent(ca_name).await? {
        Some(Credential::Certificate(ca)) => {
            debug!(ca = ca_name, "Resolved signing CA");
            Ok(CertificateValue {
                ca: ca.ca().map(str::to_string),
                certificate: ca.certificate().to_string(),
                private_key: ca.private_key(encryptor)?,
                ca_name: ca.ca_name().map(str::to_string),
            })
        }
        Some(_) => Err(CredStoreError::validation_with_value(codes::NOT_A_CA_NAME, ca_name)),
        None => Err(CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS)),
    }
}
