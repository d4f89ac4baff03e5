//! # BigQuery Indexer Repository
//!
//! This crate provides traits and implementations for the indexer's external
//! collaborators: the document store entities are indexed into, the table
//! source rows are read from, and the blob store the sample export is written
//! to. It includes definitions for errors, interfaces, and concrete
//! implementations for OpenSearch, BigQuery and Cloud Storage, plus
//! in-memory implementations for dry runs and tests.

pub mod bigquery;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod storage;
pub mod types;

pub use bigquery::{BigQueryConfig, BigQuerySource};
pub use config::StoreConfig;
pub use errors::{BlobStoreError, SourceError, StoreError};
pub use interfaces::{BlobStore, DocumentStore, DocumentStream, RowStream, TableSource};
pub use memory::{InMemorySource, InMemoryStore, StoreEvent};
pub use opensearch::{fields_index_name, OpenSearchStore};
pub use storage::{GcsBlobStore, GcsConfig, LocalBlobStore};
pub use types::{BatchOperationResult, BatchOperationSummary, DocumentHit};
