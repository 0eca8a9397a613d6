//! Audit records collected per request

use serde::{Deserialize, Serialize};

use super::permission::PermissionOperation;
use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperationCode {
    CredentialAccess,
    CredentialUpdate,
    CredentialDelete,
    CredentialFind,
    AclAccess,
    AclUpdate,
    AclDelete,
}

impl_domain_status_conversions!(AuditOperationCode {
    CredentialAccess => "credential_access",
    CredentialUpdate => "credential_update",
    CredentialDelete => "credential_delete",
    CredentialFind => "credential_find",
    AclAccess => "acl_access",
    AclUpdate => "acl_update",
    AclDelete => "acl_delete",
});

/// One `(operation code, credential, actor, operation)` tuple.
///
/// `actor` and `operation` are set on ACL records and name the entry being
/// changed, not the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation_code: AuditOperationCode,
    pub credential_name: Option<String>,
    pub actor: Option<String>,
    pub operation: Option<PermissionOperation>,
}

impl AuditRecord {
    pub fn credential(code: AuditOperationCode, name: impl Into<String>) -> Self {
        Self {
            operation_code: code,
            credential_name: Some(name.into()),
            actor: None,
            operation: None,
        }
    }

    pub fn acl(
        code: AuditOperationCode,
        name: impl Into<String>,
        actor: impl Into<String>,
        operation: PermissionOperation,
    ) -> Self {
        Self {
            operation_code: code,
            credential_name: Some(name.into()),
            actor: Some(actor.into()),
            operation: Some(operation),
        }
    }
}

/// Everything one top-level call recorded, flushed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBatch {
    pub requester: String,
    pub success: bool,
    pub records: Vec<AuditRecord>,
}
