//! Error types for the BigQuery indexer repository.

mod blob_store_error;
mod source_error;
mod store_error;

pub use blob_store_error::BlobStoreError;
pub use source_error::SourceError;
pub use store_error::StoreError;
