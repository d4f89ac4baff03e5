//! Dataset configuration directory.
//!
//! `dataset.json` names the dataset, `bigquery.json` lists the tables and
//! their ID columns, and the optional `deploy.json` names the project whose
//! bucket receives the sample export.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::IndexingError;
use bigquery_indexer_pipeline::{ColumnConfig, ExportTarget, JobConfig};

pub const DATASET_FILE: &str = "dataset.json";
pub const BIGQUERY_FILE: &str = "bigquery.json";
pub const DEPLOY_FILE: &str = "deploy.json";

#[derive(Debug, Deserialize)]
struct DatasetFile {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BigQueryFile {
    #[serde(flatten)]
    columns: ColumnConfig,
    table_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DeployFile {
    project_id: String,
}

/// Index name for a dataset name: lowercased, spaces become `_`.
pub fn index_name(dataset_name: &str) -> String {
    dataset_name.to_lowercase().replace(' ', "_")
}

/// Build the job for the dataset described in `dir`.
pub fn load_job_config(dir: &Path) -> Result<JobConfig, IndexingError> {
    let dataset: DatasetFile = read_json(&dir.join(DATASET_FILE))?;
    let bigquery: BigQueryFile = read_json(&dir.join(BIGQUERY_FILE))?;

    let deploy_path = dir.join(DEPLOY_FILE);
    let export = if deploy_path.exists() {
        let deploy: DeployFile = read_json(&deploy_path)?;
        Some(ExportTarget::for_project(&deploy.project_id))
    } else {
        None
    };

    let job = JobConfig {
        index_name: index_name(&dataset.name),
        columns: bigquery.columns,
        table_names: bigquery.table_names,
        export,
    };

    info!(
        index = %job.index_name,
        tables = job.table_names.len(),
        export = job.export.is_some(),
        "Loaded dataset configuration"
    );
    Ok(job)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, IndexingError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        IndexingError::config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&contents)
        .map_err(|e| IndexingError::config(format!("Invalid {}: {}", path.display(), e)))
}
