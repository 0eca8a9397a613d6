//! Bulk re-issue of every certificate signed by one CA

use std::collections::BTreeSet;
use std::sync::Arc;

use credstore_domain::{
    normalize_name, AuditOperationCode, CertificateValue, PermissionOperation, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::generator::resolve_ca;
use crate::audit::AuditRecorder;
use crate::credential::CredentialService;

/// Names re-issued by a successful bulk run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRegenerateResult {
    pub regenerated: Vec<String>,
}

pub struct CertificateRegenerator {
    credentials: Arc<CredentialService>,
}

impl CertificateRegenerator {
    pub fn new(credentials: Arc<CredentialService>) -> Self {
        Self { credentials }
    }

    /// Re-issue every certificate whose recorded CA is `signer_name`.
    ///
    /// Certificates are processed in name order and each is saved before the
    /// next starts. The first failure, including a missing WRITE permission,
    /// ends the run: earlier certificates stay re-issued, the failing one and
    /// everything after it are untouched.
    pub async fn regenerate_chain(
        &self,
        actor: &str,
        signer_name: &str,
        audit: &mut AuditRecorder,
    ) -> Result<BulkRegenerateResult> {
        let signer = normalize_name(signer_name);
        let permissions = self.credentials.permissions();
        permissions.ensure_readable(actor, &signer).await?;

        let store = self.credentials.store();
        let issuer = resolve_ca(store, self.credentials.encryptor(), &signer).await?;

        let names: BTreeSet<String> = store
            .repository()
            .find_certificate_names_by_ca_name(&signer)
            .await?
            .into_iter()
            .collect();

        let mut result = BulkRegenerateResult::default();
        for name in names {
            audit.credential(AuditOperationCode::CredentialUpdate, &name);
            if let Err(err) = self.reissue(actor, &name, &signer, &issuer).await {
                warn!(
                    signer = %signer,
                    credential = %name,
                    completed = result.regenerated.len(),
                    error = %err,
                    "Bulk regenerate stopped"
                );
                return Err(err);
            }
            result.regenerated.push(name);
        }

        info!(signer = %signer, count = result.regenerated.len(), "Bulk regenerate finished");
        Ok(result)
    }

    async fn reissue(
        &self,
        actor: &str,
        name: &str,
        signer: &str,
        issuer: &CertificateValue,
    ) -> Result<()> {
        self.credentials
            .permissions()
            .ensure_allowed(actor, name, PermissionOperation::Write)
            .await?;
        self.credentials.reissue_certificate(name, signer, issuer).await
    }
}
