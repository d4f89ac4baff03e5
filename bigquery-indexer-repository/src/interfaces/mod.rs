//! Interface definitions for the indexer's collaborators.
//!
//! The pipeline talks to the document store, the table source and the blob
//! store only through these traits, so each can be swapped for an in-memory
//! implementation in tests.

mod blob_store;
mod document_store;
mod table_source;

pub use blob_store::BlobStore;
pub use document_store::{DocumentStore, DocumentStream};
pub use table_source::{RowStream, TableSource};
