//! Orchestrator module for the indexing pipeline.
//!
//! Drives a job table by table: mappings, row updates, field documents, then
//! refresh and the optional sample export.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, StreamExt};
use tracing::{info, instrument, warn};

use crate::config::{ColumnConfig, JobConfig};
use crate::errors::PipelineError;
use crate::export::SampleExporter;
use crate::loader::{BulkLoader, LoadReport};
use crate::mappings::table_mappings;
use crate::processor::{field_documents, RowProcessor, RowStrategy};
use bigquery_indexer_repository::{fields_index_name, BlobStore, DocumentStore, TableSource};
use bigquery_indexer_shared::{EntityUpdate, TableSchema};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Wait after the final refresh, before the export scan.
    pub settle_delay: Duration,
}

/// What indexing one table did.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub table: String,
    /// Whether rows were merged into `samples`.
    pub sample_table: bool,
    pub rows: LoadReport,
    pub field_documents: usize,
}

/// What a whole run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub tables: Vec<TableSummary>,
    /// Exported samples, if the export ran.
    pub exported_samples: Option<usize>,
}

/// Orchestrator that coordinates the pipeline components.
///
/// Tables are indexed strictly one after another: a table's sample merges read
/// state written by earlier tables, and its mappings must be in place before
/// its first write.
pub struct Orchestrator {
    store: Arc<dyn DocumentStore>,
    source: Arc<dyn TableSource>,
    blob_store: Option<Arc<dyn BlobStore>>,
    loader: BulkLoader,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        source: Arc<dyn TableSource>,
        loader: BulkLoader,
    ) -> Self {
        Self::with_config(store, source, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        source: Arc<dyn TableSource>,
        loader: BulkLoader,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            source,
            blob_store: None,
            loader,
            config,
        }
    }

    /// Blob store the sample export is written to.
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Run a whole job.
    #[instrument(skip(self, job), fields(index = %job.index_name, tables = job.table_names.len()))]
    pub async fn run(&self, job: &JobConfig) -> Result<RunSummary, PipelineError> {
        info!("Starting indexing run");
        let fields_index = fields_index_name(&job.index_name);

        self.store.ensure_index(&job.index_name).await?;
        self.store.ensure_index(&fields_index).await?;

        let mut summary = RunSummary::default();
        for table_name in &job.table_names {
            let table = self.source.get_table(table_name).await?;

            let rows = self.index_table(&job.index_name, &table, &job.columns).await?;
            let field_documents = self
                .index_fields(&fields_index, &table, job.columns.sample_id_column.as_deref())
                .await?;

            summary.tables.push(TableSummary {
                table: table.full_name.clone(),
                sample_table: job
                    .columns
                    .sample_id_column
                    .as_deref()
                    .is_some_and(|column| table.has_column(column)),
                rows,
                field_documents,
            });
        }

        self.store.refresh(&job.index_name).await?;
        if !self.config.settle_delay.is_zero() {
            info!(delay_ms = self.config.settle_delay.as_millis() as u64, "Waiting for index to settle");
            tokio::time::sleep(self.config.settle_delay).await;
        }

        summary.exported_samples = self.export(job).await?;

        info!(tables = summary.tables.len(), "Indexing run complete");
        Ok(summary)
    }

    /// Index every row of one table into the entity index.
    ///
    /// Fails before touching the store if the table has no entity ID column.
    /// Mappings are declared before the first row is written.
    #[instrument(skip(self, table, columns), fields(table = %table.full_name))]
    pub async fn index_table(
        &self,
        index: &str,
        table: &TableSchema,
        columns: &ColumnConfig,
    ) -> Result<LoadReport, PipelineError> {
        if !table.has_column(&columns.entity_id_column) {
            return Err(PipelineError::missing_entity_id_column(
                &table.full_name,
                &columns.entity_id_column,
            ));
        }

        if let Some(mapping) = table_mappings(table, columns.sample_id_column.as_deref()) {
            self.store.put_mapping(index, &mapping).await?;
            info!(paths = mapping.len(), "Declared nested mappings");
        }

        let processor = RowProcessor::for_table(table, columns);
        match processor.strategy() {
            RowStrategy::Samples { sample_id_column } => {
                info!(sample_id_column = %sample_id_column, "Merging rows into samples")
            }
            RowStrategy::Flat => info!("Indexing rows as partial documents"),
        }

        let started = Instant::now();
        let updates = processor.process_rows(self.source.read_rows(table));
        let report = self.loader.load(index, updates).await?;
        info!(
            updates = report.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Indexed table"
        );

        check_complete(&table.full_name, report)
    }

    /// Index one lookup document per field of the table into `fields_index`.
    #[instrument(skip(self, table), fields(table = %table.full_name))]
    pub async fn index_fields(
        &self,
        fields_index: &str,
        table: &TableSchema,
        sample_id_column: Option<&str>,
    ) -> Result<usize, PipelineError> {
        let updates: Vec<Result<EntityUpdate, PipelineError>> = field_documents(table, sample_id_column)
            .into_iter()
            .map(|field| {
                let document = field.to_document();
                Ok(EntityUpdate::partial(field.id, document))
            })
            .collect();

        let report = self.loader.load(fields_index, stream::iter(updates).boxed()).await?;
        let report = check_complete(&table.full_name, report)?;
        Ok(report.total)
    }

    async fn export(&self, job: &JobConfig) -> Result<Option<usize>, PipelineError> {
        let Some(ref target) = job.export else {
            return Ok(None);
        };
        let Some(ref sample_id_column) = job.columns.sample_id_column else {
            info!("No sample ID column configured, skipping sample export");
            return Ok(None);
        };
        let Some(ref blob_store) = self.blob_store else {
            return Err(PipelineError::config(
                "an export target is configured but no blob store was provided",
            ));
        };

        let exporter = SampleExporter::new(self.store.clone(), blob_store.clone());
        let exported = exporter
            .export(&job.index_name, sample_id_column, target)
            .await?;
        Ok(Some(exported))
    }
}

fn check_complete(table: &str, report: LoadReport) -> Result<LoadReport, PipelineError> {
    if report.is_complete() {
        return Ok(report);
    }

    warn!(
        table = %table,
        failed = report.failed(),
        total = report.total,
        "Table was not fully indexed"
    );
    Err(PipelineError::PartialFailure {
        table: table.to_string(),
        failed: report.failed(),
        total: report.total,
        failures: report.failures,
    })
}
