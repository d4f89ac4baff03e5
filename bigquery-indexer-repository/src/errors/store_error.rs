//! Document store error types.
//!
//! This module defines the error types that can occur while creating indices,
//! declaring mappings, submitting bulk operations and scanning documents.

use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Validation error (e.g., an invalid index name or URL).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the store.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to check for or create an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// The store rejected a mapping update.
    #[error("Mapping error: {0}")]
    MappingError(String),

    /// The bulk request as a whole failed.
    #[error("Bulk operation error: {0}")]
    BulkOperationError(String),

    /// Failed to refresh an index.
    #[error("Refresh error: {0}")]
    RefreshError(String),

    /// Failed while scrolling through an index.
    #[error("Scan error: {0}")]
    ScanError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl StoreError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a mapping error.
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk(msg: impl Into<String>) -> Self {
        Self::BulkOperationError(msg.into())
    }

    /// Create a refresh error.
    pub fn refresh(msg: impl Into<String>) -> Self {
        Self::RefreshError(msg.into())
    }

    /// Create a scan error.
    pub fn scan(msg: impl Into<String>) -> Self {
        Self::ScanError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }
}
