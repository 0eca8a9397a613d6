//! Access control operations and entries

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{codes, CredStoreError, Result};
use crate::impl_domain_status_conversions;

/// A single operation an actor may be granted on a credential name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOperation {
    Read,
    Write,
    Delete,
    ReadAcl,
    WriteAcl,
}

impl_domain_status_conversions!(PermissionOperation {
    Read => "read",
    Write => "write",
    Delete => "delete",
    ReadAcl => "read_acl",
    WriteAcl => "write_acl",
});

impl PermissionOperation {
    pub const ALL: [Self; 5] =
        [Self::Read, Self::Write, Self::Delete, Self::ReadAcl, Self::WriteAcl];

    pub const fn bit(self) -> u8 {
        match self {
            Self::Read => 0b0_0001,
            Self::Write => 0b0_0010,
            Self::Delete => 0b0_0100,
            Self::ReadAcl => 0b0_1000,
            Self::WriteAcl => 0b1_0000,
        }
    }
}

/// Bitmask of granted operations.
///
/// Sets only ever grow through [`OperationSet::merge`]; a grant never
/// replaces what an actor already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<PermissionOperation>", from = "Vec<PermissionOperation>")]
pub struct OperationSet(u8);

impl OperationSet {
    const MASK: u8 = 0b1_1111;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(Self::MASK)
    }

    /// Rebuild a set from a persisted bitmask, rejecting unknown bits.
    pub fn from_bits(bits: i64) -> Result<Self> {
        u8::try_from(bits)
            .ok()
            .filter(|b| b & !Self::MASK == 0)
            .map(Self)
            .ok_or_else(|| {
                CredStoreError::validation_with_value(codes::INVALID_OPERATION, bits.to_string())
            })
    }

    /// Parse operation names, rejecting unknown ones with their value.
    pub fn parse<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(Self::empty(), |set, name| {
            let op = name.as_ref().parse::<PermissionOperation>().map_err(|_| {
                CredStoreError::validation_with_value(codes::INVALID_OPERATION, name.as_ref())
            })?;
            Ok(set.with(op))
        })
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, op: PermissionOperation) -> bool {
        self.0 & op.bit() != 0
    }

    #[must_use]
    pub const fn with(self, op: PermissionOperation) -> Self {
        Self(self.0 | op.bit())
    }

    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn operations(self) -> Vec<PermissionOperation> {
        PermissionOperation::ALL.into_iter().filter(|op| self.contains(*op)).collect()
    }
}

impl FromIterator<PermissionOperation> for OperationSet {
    fn from_iter<T: IntoIterator<Item = PermissionOperation>>(iter: T) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Vec<PermissionOperation>> for OperationSet {
    fn from(ops: Vec<PermissionOperation>) -> Self {
        ops.into_iter().collect()
    }
}

impl From<OperationSet> for Vec<PermissionOperation> {
    fn from(set: OperationSet) -> Self {
        set.operations()
    }
}

/// An actor together with the operations it holds (or is being granted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub actor: String,
    pub operations: OperationSet,
}

impl PermissionEntry {
    pub fn new(
        actor: impl Into<String>,
        operations: impl IntoIterator<Item = PermissionOperation>,
    ) -> Self {
        Self { actor: actor.into(), operations: operations.into_iter().collect() }
    }
}

/// Persisted access entry, unique per `(credential_name_uuid, actor)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub credential_name_uuid: Uuid,
    pub actor: String,
    pub operations: OperationSet,
}

impl From<AccessEntry> for PermissionEntry {
    fn from(entry: AccessEntry) -> Self {
        Self { actor: entry.actor, operations: entry.operations }
    }
}
