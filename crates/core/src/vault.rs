//! Entry point for the transport layer
//!
//! Each method is one top-level operation: it collects audit records while
//! it runs and flushes them to the sink whether it succeeds or fails.

use std::collections::BTreeSet;
use std::sync::Arc;

use credstore_domain::{CredentialSummary, CredentialView, PermissionEntry, Result};
use tracing::warn;
use uuid::Uuid;

use crate::audit::{AuditRecorder, AuditSink};
use crate::certificate::{BulkRegenerateResult, CertificateRegenerator};
use crate::credential::{CredentialService, GenerateRequest, SetRequest};
use crate::permission::PermissionService;
use crate::rotation::{RotationEngine, RotationReport};

pub struct CredentialVault {
    credentials: Arc<CredentialService>,
    permissions: Arc<PermissionService>,
    regenerator: CertificateRegenerator,
    rotation: RotationEngine,
    audit: Arc<dyn AuditSink>,
}

impl CredentialVault {
    pub fn new(
        credentials: Arc<CredentialService>,
        permissions: Arc<PermissionService>,
        rotation: RotationEngine,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let regenerator = CertificateRegenerator::new(Arc::clone(&credentials));
        Self { credentials, permissions, regenerator, rotation, audit }
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    pub async fn save_credential(
        &self,
        actor: &str,
        request: SetRequest,
    ) -> Result<CredentialView> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.set(actor, request, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn generate_credential(
        &self,
        actor: &str,
        request: GenerateRequest,
    ) -> Result<CredentialView> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.generate(actor, request, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn regenerate(&self, actor: &str, name: &str) -> Result<CredentialView> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.regenerate(actor, name, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn find_most_recent(&self, actor: &str, name: &str) -> Result<CredentialView> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.find_most_recent(actor, name, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn find_all_versions(&self, actor: &str, name: &str) -> Result<Vec<CredentialView>> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.find_all_versions(actor, name, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn find_by_uuid(&self, actor: &str, uuid: Uuid) -> Result<CredentialView> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.find_by_uuid(actor, uuid, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn find_containing_name(
        &self,
        actor: &str,
        fragment: &str,
    ) -> Result<Vec<CredentialSummary>> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.find_containing_name(actor, fragment, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn find_starting_with_path(
        &self,
        actor: &str,
        prefix: &str,
    ) -> Result<Vec<CredentialSummary>> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.find_starting_with_path(actor, prefix, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn list_paths_under(&self, actor: &str, prefix: &str) -> Result<BTreeSet<String>> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.list_paths_under(actor, prefix, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn delete(&self, actor: &str, name: &str) -> Result<()> {
        let mut audit = AuditRecorder::new();
        let result = self.credentials.delete(actor, name, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    pub async fn list_permissions(&self, actor: &str, name: &str) -> Result<Vec<PermissionEntry>> {
        let mut audit = AuditRecorder::new();
        let result = self.permissions.list(actor, name, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn grant(
        &self,
        actor: &str,
        name: &str,
        entries: Vec<PermissionEntry>,
    ) -> Result<Vec<PermissionEntry>> {
        let mut audit = AuditRecorder::new();
        let result = self.permissions.grant(actor, name, entries, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    pub async fn revoke(&self, actor: &str, name: &str, target: &str) -> Result<bool> {
        let mut audit = AuditRecorder::new();
        let result = self.permissions.revoke(actor, name, target, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    // ========================================================================
    // Certificates and keys
    // ========================================================================

    pub async fn regenerate_certificate_chain(
        &self,
        actor: &str,
        signer_name: &str,
    ) -> Result<BulkRegenerateResult> {
        let mut audit = AuditRecorder::new();
        let result = self.regenerator.regenerate_chain(actor, signer_name, &mut audit).await;
        self.flush(actor, audit, result.is_ok()).await;
        result
    }

    /// Not audited; the engine logs its own summary.
    pub async fn run_key_rotation(&self) -> Result<RotationReport> {
        self.rotation.run().await
    }

    async fn flush(&self, actor: &str, audit: AuditRecorder, success: bool) {
        if audit.records().is_empty() {
            return;
        }
        if let Err(err) = self.audit.record(audit.finish(actor, success)).await {
            warn!(error = %err, "Failed to write audit records");
        }
    }
}
