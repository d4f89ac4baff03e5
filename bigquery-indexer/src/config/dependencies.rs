//! Dependency initialization and wiring for the indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::{load_job_config, Cli};
use crate::IndexingError;
use bigquery_indexer_pipeline::{BulkLoader, JobConfig, Orchestrator};
use bigquery_indexer_repository::{
    BigQueryConfig, BigQuerySource, BlobStore, GcsBlobStore, GcsConfig, LocalBlobStore,
    OpenSearchStore,
};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
    /// The job the orchestrator runs.
    pub job: JobConfig,
}

impl Dependencies {
    /// Initialize all dependencies from the command line and the dataset
    /// configuration directory it points at.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If configuration is invalid or a client cannot be built
    pub async fn new(cli: &Cli) -> Result<Self, IndexingError> {
        let job = load_job_config(&cli.dataset_config_dir)?;

        info!(
            elasticsearch_url = %cli.elasticsearch_url,
            billing_project_id = %cli.billing_project_id,
            index = %job.index_name,
            "Initializing dependencies"
        );

        let store = OpenSearchStore::new(&cli.elasticsearch_url, cli.store_config())
            .await
            .map_err(|e| IndexingError::config(format!("Failed to create Elasticsearch client: {}", e)))?;

        let source = BigQuerySource::new(
            BigQueryConfig::new(&cli.billing_project_id).with_access_token(cli.access_token.clone()),
        )
        .map_err(|e| IndexingError::config(format!("Failed to create BigQuery client: {}", e)))?;

        let store = Arc::new(store);
        let loader = BulkLoader::with_config(store.clone(), cli.loader_config());
        let mut orchestrator =
            Orchestrator::with_config(store, Arc::new(source), loader, cli.orchestrator_config());

        if let Some(ref export) = job.export {
            orchestrator = orchestrator.with_blob_store(blob_store(cli, &export.project_id)?);
        }

        Ok(Self { orchestrator, job })
    }
}

/// The blob store the sample export goes to: a local directory when one is
/// given, the deploy project's Cloud Storage otherwise.
fn blob_store(cli: &Cli, project_id: &str) -> Result<Arc<dyn BlobStore>, IndexingError> {
    if let Some(ref dir) = cli.export_dir {
        info!(dir = %dir.display(), "Writing sample export to local directory");
        return Ok(Arc::new(LocalBlobStore::new(dir.clone())));
    }

    let gcs = GcsBlobStore::new(GcsConfig::new(project_id).with_access_token(cli.access_token.clone()))
        .map_err(|e| IndexingError::config(format!("Failed to create Cloud Storage client: {}", e)))?;
    Ok(Arc::new(gcs))
}
