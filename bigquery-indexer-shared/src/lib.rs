//! # BigQuery Indexer Shared
//!
//! Types shared by the repository, pipeline and binary crates: table schemas
//! and rows as read from BigQuery, the nested-mapping tree declared on the
//! search index, the per-entity operations submitted in bulk, and the
//! records produced by the sample export.

pub mod document;
pub mod mapping;
pub mod row;
pub mod schema;

pub use document::{
    merge_sample, Document, EntityOperation, EntityUpdate, ExportRecord, FieldDocument,
    SampleMerge, SAMPLES_FIELD,
};
pub use mapping::{MappingEntry, MappingTree};
pub use row::Row;
pub use schema::{standard_table_name, FieldMode, FieldType, SchemaField, TableReference, TableSchema};
