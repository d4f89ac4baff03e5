//! Command line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use bigquery_indexer_pipeline::{LoaderConfig, OrchestratorConfig};
use bigquery_indexer_repository::StoreConfig;

/// Default Elasticsearch URL.
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";

/// Index a BigQuery dataset into Elasticsearch.
#[derive(Parser, Debug, Clone)]
#[command(name = "bigquery-indexer")]
#[command(about = "Indexes BigQuery tables into Elasticsearch", long_about = None)]
pub struct Cli {
    /// Elasticsearch URL
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = DEFAULT_ELASTICSEARCH_URL)]
    pub elasticsearch_url: String,

    /// Directory containing dataset.json, bigquery.json and optionally deploy.json
    #[arg(long, env = "DATASET_CONFIG_DIR")]
    pub dataset_config_dir: PathBuf,

    /// Project billed for BigQuery query jobs
    #[arg(long, env = "BILLING_PROJECT_ID")]
    pub billing_project_id: String,

    /// OAuth access token sent to BigQuery and Cloud Storage
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Write the sample export under this directory instead of Cloud Storage
    #[arg(long, env = "EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Updates per bulk request
    #[arg(long, env = "BATCH_SIZE", default_value = "500")]
    pub batch_size: usize,

    /// Seconds to wait after the final refresh before exporting
    #[arg(long, env = "SETTLE_DELAY_SECS", default_value = "0")]
    pub settle_delay_secs: u64,
}

impl Cli {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            batch_size: self.batch_size,
            ..LoaderConfig::default()
        }
    }

    /// Store settings whose bulk limit admits a full loader batch.
    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::default();
        if let Some(max) = config.max_batch_size {
            config.max_batch_size = Some(max.max(self.batch_size));
        }
        config
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            settle_delay: Duration::from_secs(self.settle_delay_secs),
        }
    }
}
