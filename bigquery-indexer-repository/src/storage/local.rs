//! Directory-backed blob store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::BlobStoreError;
use crate::interfaces::BlobStore;

/// Writes each container as a directory under `root` and each blob as a file.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a blob is written to.
    pub fn blob_path(&self, container: &str, name: &str) -> PathBuf {
        self.root.join(container).join(name)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<(), BlobStoreError> {
        tokio::fs::create_dir_all(self.root.join(container)).await?;
        Ok(())
    }

    async fn write_blob(
        &self,
        container: &str,
        name: &str,
        content: Vec<u8>,
    ) -> Result<(), BlobStoreError> {
        let path = self.blob_path(container, name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), "Wrote blob");
        Ok(())
    }
}
