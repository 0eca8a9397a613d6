//! Port interfaces for encryption key canaries

use async_trait::async_trait;
use credstore_domain::{EncryptionKeyCanary, Result};
use uuid::Uuid;

/// Persistence for key canaries.
#[async_trait]
pub trait CanaryRepository: Send + Sync {
    /// Every canary ever created, in no particular order
    async fn find_all(&self) -> Result<Vec<EncryptionKeyCanary>>;

    /// Insert a new canary
    async fn save(&self, canary: EncryptionKeyCanary) -> Result<()>;

    /// Delete the given canaries, returning how many existed
    async fn delete(&self, uuids: &[Uuid]) -> Result<usize>;
}
