//! Blob store implementations.

mod gcs;
mod local;

pub use gcs::{GcsBlobStore, GcsConfig, DEFAULT_GCS_UPLOAD_URL, DEFAULT_GCS_URL};
pub use local::LocalBlobStore;
