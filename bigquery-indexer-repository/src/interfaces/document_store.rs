//! Document store trait definition.
//!
//! This module defines the abstract interface for the bulk document store,
//! allowing for different backend implementations (OpenSearch, in-memory).

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::StoreError;
use crate::types::{BatchOperationSummary, DocumentHit};
use bigquery_indexer_shared::{EntityUpdate, MappingTree};

/// A lazily fetched stream of every document in an index.
pub type DocumentStream<'a> = BoxStream<'a, Result<DocumentHit, StoreError>>;

/// Abstracts the underlying document store (OpenSearch, Elasticsearch, in-memory).
///
/// The store owns durable entity documents. The pipeline only issues
/// operations against it: index creation, mapping declarations, bulk
/// partial-update and sample-merge operations, refresh, and full scans.
///
/// All methods return `Result<T, StoreError>` for consistent error handling
/// across backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the index if it does not exist.
    ///
    /// # Arguments
    ///
    /// * `index` - The index name
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index exists or was created
    /// * `Err(StoreError)` - If the check or creation fails
    async fn ensure_index(&self, index: &str) -> Result<(), StoreError>;

    /// Declare nested and structured mapping paths on an index.
    ///
    /// Must be called before any document referencing a new nested path is
    /// written; the store rejects changing a path that already has a flat
    /// mapping to `nested`.
    async fn put_mapping(&self, index: &str, mapping: &MappingTree) -> Result<(), StoreError>;

    /// Apply entity operations in a single bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-item results; individual items may have failed
    /// * `Err(StoreError)` - If the request as a whole failed
    async fn bulk_apply(
        &self,
        index: &str,
        updates: &[EntityUpdate],
    ) -> Result<BatchOperationSummary, StoreError>;

    /// Make all previously applied operations visible to searches and scans.
    async fn refresh(&self, index: &str) -> Result<(), StoreError>;

    /// Stream every document in the index.
    ///
    /// Implementations fetch documents page by page so memory stays bounded
    /// regardless of index size.
    fn scan_documents<'a>(&'a self, index: &'a str) -> DocumentStream<'a>;
}
