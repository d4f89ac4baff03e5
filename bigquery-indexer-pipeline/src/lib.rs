//! # BigQuery Indexer Pipeline
//!
//! This crate provides the pipeline components for reading BigQuery tables
//! and merging their rows into per-entity documents in the document store.
//!
//! ## Architecture
//!
//! The pipeline follows the Source-Processor-Loader pattern:
//!
//! 1. **Mappings**: Declares nested paths before a table is written
//! 2. **Processor**: Transforms rows into partial documents or sample merges
//! 3. **Loader**: Submits updates to the document store in bulk
//! 4. **Orchestrator**: Sequences tables and runs the sample export

pub mod config;
pub mod errors;
pub mod export;
pub mod loader;
pub mod mappings;
pub mod orchestrator;
pub mod processor;

pub use config::{ColumnConfig, ExportTarget, JobConfig};
pub use errors::PipelineError;
pub use export::SampleExporter;
pub use loader::{BulkLoader, LoadReport, LoaderConfig};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunSummary, TableSummary};
pub use processor::RowProcessor;
