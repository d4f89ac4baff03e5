//! Blob store error types.

use thiserror::Error;

/// Errors that can occur while writing blobs.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// Failed to reach the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to look up or create a container.
    #[error("Container error: {0}")]
    ContainerError(String),

    /// Failed to write a blob.
    #[error("Write error: {0}")]
    WriteError(String),

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobStoreError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn container(msg: impl Into<String>) -> Self {
        Self::ContainerError(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::WriteError(msg.into())
    }
}
