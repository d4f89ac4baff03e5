use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use bigquery_indexer::logging::{self, LogFormat};
use bigquery_indexer::{Cli, Dependencies, IndexingError};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init(LogFormat::from_env());

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Indexing failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), IndexingError> {
    let dependencies = Dependencies::new(cli).await?;
    let summary = dependencies.orchestrator.run(&dependencies.job).await?;

    for table in &summary.tables {
        info!(
            table = %table.table,
            sample_table = table.sample_table,
            updates = table.rows.total,
            field_documents = table.field_documents,
            "Table indexed"
        );
    }
    if let Some(exported) = summary.exported_samples {
        info!(samples = exported, "Sample export written");
    }
    Ok(())
}
