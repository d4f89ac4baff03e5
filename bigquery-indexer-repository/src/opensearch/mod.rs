//! OpenSearch implementation of the document store.
//!
//! This module provides a concrete implementation of `DocumentStore` using
//! OpenSearch as the backend. The document, bulk, mapping and scroll APIs it
//! uses are shared with Elasticsearch.

mod bulk;
mod client;
mod index_config;
mod scripts;

pub use client::OpenSearchStore;
pub use index_config::{fields_index_name, get_index_settings, FIELDS_INDEX_SUFFIX};
pub use scripts::{MERGE_SAMPLE_SCRIPT, SCRIPT_LANG};
