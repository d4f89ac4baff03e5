//! Configuration module for the indexer.

mod cli;
mod dataset;
mod dependencies;

pub use cli::{Cli, DEFAULT_ELASTICSEARCH_URL};
pub use dataset::{index_name, load_job_config, BIGQUERY_FILE, DATASET_FILE, DEPLOY_FILE};
pub use dependencies::Dependencies;
