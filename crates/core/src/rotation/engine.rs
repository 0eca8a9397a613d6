//! Key rotation engine

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use credstore_domain::constants::ROTATION_BATCH_SIZE;
use credstore_domain::{CredStoreError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::credential::factory::from_stored;
use crate::credential::ports::CredentialRepository;
use crate::keys::{CanaryRepository, Encryptor};

/// Outcome of one rotation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationReport {
    /// Versions re-encrypted under the active key
    pub rotated: u64,
    /// Versions changed by someone else between read and write
    pub conflicts: u64,
    /// Versions still encrypted under keys no configured key can open
    pub remaining_unknown: u64,
    pub deleted_canaries: usize,
}

/// Re-encrypts every version held under a known inactive key.
///
/// Each page is re-queried after the previous one is written, so an
/// interrupted run resumes where it stopped. Every version is its own unit
/// of work; there is no transaction spanning the run.
pub struct RotationEngine {
    credentials: Arc<dyn CredentialRepository>,
    canaries: Arc<dyn CanaryRepository>,
    encryptor: Encryptor,
    batch_size: usize,
    running: AtomicBool,
}

impl RotationEngine {
    pub fn new(
        credentials: Arc<dyn CredentialRepository>,
        canaries: Arc<dyn CanaryRepository>,
        encryptor: Encryptor,
    ) -> Self {
        Self {
            credentials,
            canaries,
            encryptor,
            batch_size: ROTATION_BATCH_SIZE,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rotate, then retire canaries nothing references any more.
    ///
    /// A batch error stops the run instead of skipping the version; a rerun
    /// picks up whatever is left.
    pub async fn run(&self) -> Result<RotationReport> {
        let _guard = RunGuard::acquire(&self.running)?;

        let table = self.encryptor.key_table();
        let inactive = table.known_inactive_key_ids();
        let before = self.credentials.count_by_key_id().await?;
        info!(
            active_key_id = %table.active_key_id(),
            inactive_keys = inactive.len(),
            counts = ?before,
            "Starting key rotation"
        );

        let mut report = RotationReport::default();
        if !inactive.is_empty() {
            self.rotate_pages(&inactive, &mut report).await?;
        }

        let after = self.credentials.count_by_key_id().await?;
        report.remaining_unknown =
            table.unknown_key_ids().iter().filter_map(|id| after.get(id)).sum();
        report.deleted_canaries = self.retire_canaries(&inactive, &after).await?;

        info!(
            rotated = report.rotated,
            conflicts = report.conflicts,
            remaining_unknown = report.remaining_unknown,
            deleted_canaries = report.deleted_canaries,
            counts = ?after,
            "Finished key rotation"
        );
        Ok(report)
    }

    async fn rotate_pages(&self, inactive: &[Uuid], report: &mut RotationReport) -> Result<()> {
        let mut page_number = 0usize;
        loop {
            let page = self.credentials.find_by_key_ids(inactive, self.batch_size).await?;
            if page.is_empty() {
                return Ok(());
            }
            page_number += 1;
            debug!(page = page_number, size = page.len(), "Rotating batch");

            let mut rotated_in_page = 0u64;
            for version in page {
                let uuid = version.uuid;
                let (expected_key_id, expected_nonce) = (version.key_id, version.nonce.clone());

                let mut credential = from_stored(version);
                let outcome = match credential.rotate(&self.encryptor) {
                    Ok(()) => {
                        self.credentials
                            .update_encryption(
                                credential.version(),
                                expected_key_id,
                                &expected_nonce,
                            )
                            .await
                    }
                    Err(err) => Err(err),
                };

                match outcome {
                    Ok(true) => rotated_in_page += 1,
                    Ok(false) => {
                        warn!(
                            version = %uuid,
                            "Version changed during rotation; leaving it for the next page"
                        );
                        report.conflicts += 1;
                    }
                    Err(err) => {
                        error!(version = %uuid, error = %err, "Rotation batch aborted");
                        return Err(err);
                    }
                }
            }

            report.rotated += rotated_in_page;
            if rotated_in_page == 0 {
                error!(page = page_number, "Rotation made no progress");
                return Err(CredStoreError::Internal("rotation made no progress".into()));
            }
        }
    }

    /// Delete canaries of inactive keys with no remaining versions.
    async fn retire_canaries(
        &self,
        inactive: &[Uuid],
        counts: &HashMap<Uuid, u64>,
    ) -> Result<usize> {
        let unreferenced: Vec<Uuid> = inactive
            .iter()
            .copied()
            .filter(|id| counts.get(id).copied().unwrap_or(0) == 0)
            .collect();
        if unreferenced.is_empty() {
            return Ok(0);
        }
        self.canaries.delete(&unreferenced).await
    }
}

struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        if flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(CredStoreError::Internal("rotation already in progress".into()));
        }
        Ok(Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
