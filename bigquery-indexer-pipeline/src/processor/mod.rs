//! Processor module for the indexing pipeline.
//!
//! Transforms table rows into entity updates and schemas into field lookup
//! documents.

mod field_processor;
mod row_processor;

pub use field_processor::field_documents;
pub use row_processor::{
    build_document, build_sample_merge, entity_id, flag_name, FileFlag, RowProcessor, RowStrategy,
    UpdateStream,
};
