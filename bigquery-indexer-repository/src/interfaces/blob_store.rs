//! Blob store trait definition.

use async_trait::async_trait;

use crate::errors::BlobStoreError;

/// Accepts named blob writes into containers (buckets, directories).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Look up a container, creating it if it does not exist.
    async fn ensure_container(&self, container: &str) -> Result<(), BlobStoreError>;

    /// Write a blob, replacing any existing blob with the same name.
    async fn write_blob(
        &self,
        container: &str,
        name: &str,
        content: Vec<u8>,
    ) -> Result<(), BlobStoreError>;
}
