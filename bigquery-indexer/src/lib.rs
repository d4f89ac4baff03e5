//! # BigQuery Indexer
//!
//! Main library for the BigQuery to Elasticsearch indexer.
//!
//! This crate provides the command line, dataset configuration loading and
//! dependency wiring for running the indexing pipeline once over a dataset.

pub mod config;
pub mod logging;

pub use config::{Cli, Dependencies};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] bigquery_indexer_pipeline::PipelineError),

    /// Document store error.
    #[error("Store error: {0}")]
    StoreError(#[from] bigquery_indexer_repository::StoreError),

    /// Table source error.
    #[error("Source error: {0}")]
    SourceError(#[from] bigquery_indexer_repository::SourceError),

    /// Blob store error.
    #[error("Blob store error: {0}")]
    BlobStoreError(#[from] bigquery_indexer_repository::BlobStoreError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
