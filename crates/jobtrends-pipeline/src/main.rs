//! Jobtrends ingest - pipeline entrypoint

use anyhow::Result;
use clap::Parser;
use jobtrends_common::logging::{init_logging, LogConfig};
use jobtrends_pipeline::config::Config;
use jobtrends_pipeline::load::JobLoader;
use jobtrends_pipeline::orchestrator::{self, Orchestrator};
use jobtrends_pipeline::staging::StagingStore;
use jobtrends_pipeline::JobsApiClient;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "jobtrends-ingest")]
#[command(author, version, about = "Job postings ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Fetch pages from the upstream API and stage them
    Fetch {
        /// Free-text search query
        #[arg(short, long, default_value = "data science")]
        query: String,

        /// Records per page
        #[arg(long, default_value_t = 50)]
        page_size: u32,

        /// Page cap per run
        #[arg(long, default_value_t = 10)]
        max_pages: u32,
    },

    /// Transform and load staged pages for one partition
    Process {
        /// Partition date (YYYY-MM-DD); defaults to the latest staged one
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Transform and load exactly one staged key (storage-change event)
    Event {
        /// Staged page key, e.g. raw/2024-01-03/page_1.json
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let log_config = LogConfig::from_env().with_level(level);
    init_logging(&log_config)?;

    let config = Config::load()?;

    match cli.command {
        Command::Fetch {
            query,
            page_size,
            max_pages,
        } => {
            let client = JobsApiClient::new(&config.upstream)?;
            let staging = StagingStore::new(&config.staging)?;
            let report =
                orchestrator::run_ingest(&client, &staging, &query, page_size, max_pages).await?;
            info!(
                partition = %report.partition,
                pages = report.pages_staged,
                records = report.records_staged,
                "ingest finished"
            );
        },
        Command::Process { date } => {
            let staging = StagingStore::new(&config.staging)?;
            let loader = JobLoader::new(config.database.connect().await?);
            loader.ensure_schema().await?;

            let orchestrator = Orchestrator::new(staging, loader);
            let report = orchestrator.run_batch(date.as_deref()).await?;
            info!(
                partition = %report.partition,
                pages = report.pages_processed,
                jobs_inserted = report.jobs_inserted,
                skills_inserted = report.skills_inserted,
                rows_skipped = report.rows_skipped,
                conflicts = report.conflicts,
                failed = report.failed_keys.len(),
                "batch finished"
            );

            if !report.failed_keys.is_empty() {
                anyhow::bail!("{} page(s) failed: {:?}", report.failed_keys.len(), report.failed_keys);
            }
        },
        Command::Event { key } => {
            let staging = StagingStore::new(&config.staging)?;
            let loader = JobLoader::new(config.database.connect().await?);
            loader.ensure_schema().await?;

            let orchestrator = Orchestrator::new(staging, loader);
            let outcome = orchestrator.run_event(&key).await?;
            info!(
                key = %outcome.key,
                status = ?outcome.status,
                jobs_inserted = outcome.stats.jobs_inserted,
                "event finished"
            );
        },
    }

    Ok(())
}
