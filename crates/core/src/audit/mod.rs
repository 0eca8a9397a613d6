//! Per-call audit collection
//!
//! Services push records into an [`AuditRecorder`] while they work; the
//! vault flushes the whole batch to the [`AuditSink`] once the call ends,
//! whether it succeeded or not.

use async_trait::async_trait;
use credstore_domain::{
    AuditBatch, AuditOperationCode, AuditRecord, PermissionEntry, Result,
};

/// Destination for audit batches.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, batch: AuditBatch) -> Result<()>;
}

/// Records collected during one top-level call.
#[derive(Debug, Default)]
pub struct AuditRecorder {
    records: Vec<AuditRecord>,
}

impl AuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(&mut self, code: AuditOperationCode, name: &str) {
        self.records.push(AuditRecord::credential(code, name));
    }

    /// Record without a credential name, for searches.
    pub fn operation(&mut self, code: AuditOperationCode) {
        self.records.push(AuditRecord {
            operation_code: code,
            credential_name: None,
            actor: None,
            operation: None,
        });
    }

    /// One record per granted operation of every entry.
    pub fn permissions(
        &mut self,
        code: AuditOperationCode,
        name: &str,
        entries: &[PermissionEntry],
    ) {
        for entry in entries {
            for operation in entry.operations.operations() {
                self.records.push(AuditRecord::acl(code, name, entry.actor.as_str(), operation));
            }
        }
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn finish(self, requester: &str, success: bool) -> AuditBatch {
        AuditBatch { requester: requester.to_string(), success, records: self.records }
    }
}
