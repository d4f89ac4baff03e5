//! Error types for the indexing pipeline.

use bigquery_indexer_repository::{BatchOperationResult, BlobStoreError, SourceError, StoreError};
use thiserror::Error;

/// Errors that can occur in the indexing pipeline.
///
/// Every variant aborts the run: a table that was only partly written leaves
/// merge state that later tables cannot reason about.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The table lacks the configured entity ID column.
    #[error("Entity ID column {column} not found in table {table}")]
    MissingEntityIdColumn { table: String, column: String },

    /// Invalid job configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Some bulk items were rejected by the document store.
    #[error("{failed} of {total} operations failed while indexing {table}")]
    PartialFailure {
        table: String,
        failed: usize,
        total: usize,
        failures: Vec<BatchOperationResult>,
    },

    /// Error from the document store.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Error from the table source.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error from the blob store.
    #[error("Blob store error: {0}")]
    BlobStoreError(#[from] BlobStoreError),

    /// Failed to serialize export output.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PipelineError {
    /// Create a missing entity ID column error.
    pub fn missing_entity_id_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingEntityIdColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
