//! Audit sink that writes records as structured `tracing` events

use async_trait::async_trait;
use credstore_core::AuditSink;
use credstore_domain::{AuditBatch, Result};
use tracing::{info, warn};

/// Target every audit event is emitted on, for routing with `EnvFilter`.
pub const AUDIT_TARGET: &str = "credstore::audit";

/// Emits one event per audit record on [`AUDIT_TARGET`].
///
/// Successful calls are logged at `INFO`, failed ones at `WARN`. Values and
/// key material never reach this sink; records carry names and operations
/// only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, batch: AuditBatch) -> Result<()> {
        for record in &batch.records {
            let operation = record.operation.map(|op| op.to_string());
            if batch.success {
                info!(
                    target: AUDIT_TARGET,
                    requester = %batch.requester,
                    success = batch.success,
                    operation_code = %record.operation_code,
                    credential_name = record.credential_name.as_deref(),
                    actor = record.actor.as_deref(),
                    operation = operation.as_deref(),
                    "audit"
                );
            } else {
                warn!(
                    target: AUDIT_TARGET,
                    requester = %batch.requester,
                    success = batch.success,
                    operation_code = %record.operation_code,
                    credential_name = record.credential_name.as_deref(),
                    actor = record.actor.as_deref(),
                    operation = operation.as_deref(),
                    "audit"
                );
            }
        }
        Ok(())
    }
}
