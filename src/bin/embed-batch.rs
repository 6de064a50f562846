//! # Embedding Batch Runner
//!
//! Runs one batch of embedding jobs end to end and prints the report as JSON
//! on stdout. Jobs are read from a file or from stdin.

use anyhow::Context;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

use embedding_batch::config::ConfigManager;
use embedding_batch::database::{DatabaseConnection, IdentifierPolicy, PgContentStore};
use embedding_batch::logging::init_structured_logging;
use embedding_batch::messaging::PgmqJobQueue;
use embedding_batch::pipeline::{BatchPipeline, Collaborators, JobIntake, PipelineSettings};
use embedding_batch::provider::OpenAiBatchClient;
use embedding_batch::PipelineError;

/// Exit status for a rejected payload
const EXIT_MALFORMED: i32 = 2;

#[derive(Parser)]
#[command(name = "embed-batch")]
#[command(about = "Submit a batch of embedding jobs and reconcile the results")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// JSON array of jobs; reads stdin when omitted or `-`
    #[arg(short, long)]
    jobs: Option<PathBuf>,

    /// Configuration file (default: config/embedding-batch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cancel the whole run after this many milliseconds, measured from the start
    #[arg(long)]
    max_wait_ms: Option<u64>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    if let Err(e) = run(cli).await {
        let malformed = e
            .downcast_ref::<PipelineError>()
            .is_some_and(PipelineError::is_client_error);

        error!("Batch run failed: {:#}", e);
        eprintln!("error: {e:#}");
        process::exit(if malformed { EXIT_MALFORMED } else { 1 });
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let payload = read_payload(cli.jobs.as_ref())?;
    let jobs = JobIntake::decode(&payload)?;

    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(path),
        None => ConfigManager::load(),
    }
    .map_err(PipelineError::from)?;
    let config = manager.config();
    config
        .validate_connections()
        .map_err(PipelineError::from)?;

    let db = DatabaseConnection::connect(&config.database)
        .await
        .map_err(|e| PipelineError::startup("database", e.to_string()))?;
    let healthy = db
        .health_check()
        .await
        .map_err(|e| PipelineError::startup("database", e.to_string()))?;
    if !healthy {
        return Err(PipelineError::startup("database", "health check failed").into());
    }

    let store = PgContentStore::new(
        db.pool().clone(),
        IdentifierPolicy::from_allowed_tables(&config.pipeline.allowed_tables),
    );
    let queue = PgmqJobQueue::new_with_pool(db.pool().clone(), &config.queue.name).await;
    let queue_name = queue.queue_name().to_string();
    let provider = OpenAiBatchClient::new(&config.provider)
        .map_err(|e| PipelineError::startup("provider", e.to_string()))?;

    let pipeline = BatchPipeline::new(
        Collaborators::new(Arc::new(store), Arc::new(queue), Arc::new(provider)),
        PipelineSettings::from_config(config),
    );

    let max_wait = cli
        .max_wait_ms
        .map(std::time::Duration::from_millis)
        .or_else(|| config.pipeline.max_wait());

    info!(job_count = jobs.len(), queue = %queue_name, "Starting batch run");
    let report = pipeline.run_batch_with_deadline(jobs, max_wait).await;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to serialize report")?;
    println!("{rendered}");

    db.close().await;
    Ok(())
}

fn read_payload(path: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read(path)
            .with_context(|| format!("failed to read jobs from {}", path.display())),
        _ => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read jobs from stdin")?;
            Ok(buffer)
        }
    }
}
