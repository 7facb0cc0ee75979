//! Pipeline orchestration
//!
//! Two phases built from the same components:
//!
//! - **Ingest**: pull pages from the upstream API and persist each one to
//!   the staging store under today's partition ([`run_ingest`]).
//! - **Load**: read staged pages back and run transform → load, either for a
//!   whole partition ([`Orchestrator::run_batch`]) or for exactly one key
//!   handed in by a storage-change notification
//!   ([`Orchestrator::run_event`]).
//!
//! Per page the lifecycle is `Staged → Transforming → Loaded |
//! Skipped(reason) | Failed(reason)`, terminal in all cases. Batch mode
//! isolates per-page failures and reports them at the end; only conditions
//! that block all progress (staging unreachable, no database) abort a run.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::fetch::JobsApiClient;
use crate::load::{JobLoader, LoadStats};
use crate::staging::StagingStore;
use crate::transform;

/// Terminal state of one processed page
#[derive(Debug, Clone, PartialEq)]
pub enum PageStatus {
    /// Canonical records were written (possibly all duplicates, still a load)
    Loaded,
    /// Nothing to load, e.g. every record was dropped in transform
    Skipped(String),
    /// Transform input unreadable or the load itself failed
    Failed(String),
}

/// Outcome of transform → load for a single staged key
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub key: String,
    pub status: PageStatus,
    /// Raw records read from the staged page
    pub records_seen: usize,
    /// Records dropped by transform, with reasons logged
    pub records_skipped: usize,
    pub stats: LoadStats,
}

impl PageOutcome {
    fn failed(key: &str, reason: String) -> Self {
        Self {
            key: key.to_string(),
            status: PageStatus::Failed(reason),
            records_seen: 0,
            records_skipped: 0,
            stats: LoadStats::default(),
        }
    }
}

/// Aggregate summary of one batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub partition: String,
    pub pages_processed: usize,
    pub jobs_inserted: u64,
    pub skills_inserted: u64,
    /// Records dropped in transform plus job ids already loaded
    pub rows_skipped: u64,
    /// Inserts swallowed by a uniqueness constraint despite the pre-check
    pub conflicts: u64,
    pub failed_keys: Vec<String>,
}

/// Summary of one ingest run
#[derive(Debug, Default)]
pub struct IngestReport {
    pub partition: String,
    pub pages_staged: usize,
    pub records_staged: usize,
}

/// Ingest phase: fetch pages and stage them under today's partition
///
/// Pages sequentially until the upstream returns an empty page or the page
/// cap is reached, with the client's politeness delay between successful
/// calls. Any fetch or staging failure aborts the run; pages already staged
/// stay staged (overwrite-safe on retry).
pub async fn run_ingest(
    client: &JobsApiClient,
    staging: &StagingStore,
    query: &str,
    page_size: u32,
    max_pages: u32,
) -> Result<IngestReport> {
    let date = Utc::now().date_naive();
    let mut report = IngestReport {
        partition: date.format("%Y-%m-%d").to_string(),
        ..IngestReport::default()
    };

    info!(query, page_size, max_pages, partition = %report.partition, "starting ingest");

    for page in 1..=max_pages {
        let records = client
            .fetch_page(page, page_size, query)
            .await
            .with_context(|| format!("Failed to fetch page {}", page))?;

        if records.is_empty() {
            info!(page, "no more records, ingest complete");
            break;
        }

        staging.put_page(date, page, &records).await?;
        report.pages_staged += 1;
        report.records_staged += records.len();

        if page < max_pages {
            tokio::time::sleep(client.politeness_delay()).await;
        }
    }

    info!(
        pages = report.pages_staged,
        records = report.records_staged,
        partition = %report.partition,
        "ingest complete"
    );

    Ok(report)
}

/// Drives staged pages through transform and load
pub struct Orchestrator {
    staging: StagingStore,
    loader: JobLoader,
}

impl Orchestrator {
    pub fn new(staging: StagingStore, loader: JobLoader) -> Self {
        Self { staging, loader }
    }

    /// Batch mode: process every page of one partition
    ///
    /// Resolves the latest partition when no date is given. Per-page
    /// failures are isolated and collected into the report; staging
    /// failures that prevent any progress abort the run.
    pub async fn run_batch(&self, date: Option<&str>) -> Result<BatchReport> {
        let partition = match date {
            Some(d) => d.to_string(),
            None => match self.staging.latest_partition().await? {
                Some(p) => p,
                None => {
                    warn!("no staged partitions found, nothing to process");
                    return Ok(BatchReport::default());
                },
            },
        };

        let keys = self.staging.page_keys(&partition).await?;

        info!(partition = %partition, pages = keys.len(), "starting batch run");

        let mut report = BatchReport {
            partition: partition.clone(),
            ..BatchReport::default()
        };

        for key in &keys {
            let outcome = self.process_key(key).await;
            report.pages_processed += 1;
            report.jobs_inserted += outcome.stats.jobs_inserted;
            report.skills_inserted += outcome.stats.skills_inserted;
            report.rows_skipped += outcome.records_skipped as u64 + outcome.stats.jobs_skipped;
            report.conflicts += outcome.stats.conflicts;

            match &outcome.status {
                PageStatus::Loaded => {},
                PageStatus::Skipped(reason) => {
                    info!(key = %key, reason = %reason, "page skipped");
                },
                PageStatus::Failed(reason) => {
                    error!(key = %key, reason = %reason, "page failed, continuing");
                    report.failed_keys.push(key.clone());
                },
            }
        }

        info!(
            partition = %report.partition,
            pages = report.pages_processed,
            jobs_inserted = report.jobs_inserted,
            skills_inserted = report.skills_inserted,
            rows_skipped = report.rows_skipped,
            conflicts = report.conflicts,
            failed = report.failed_keys.len(),
            "batch run complete"
        );

        Ok(report)
    }

    /// Event-driven mode: process exactly one staged key
    ///
    /// Safe under at-least-once delivery: a duplicate invocation finds every
    /// job id already loaded and inserts nothing. Failures are returned as
    /// errors so the trigger can redeliver.
    pub async fn run_event(&self, key: &str) -> Result<PageOutcome> {
        let outcome = self.process_key(key).await;

        if let PageStatus::Failed(reason) = &outcome.status {
            anyhow::bail!("failed to process staged key {}: {}", key, reason);
        }

        Ok(outcome)
    }

    /// Transform → load for one staged key; always reaches a terminal state
    async fn process_key(&self, key: &str) -> PageOutcome {
        let raw = match self.staging.get_page(key).await {
            Ok(records) => records,
            Err(e) => return PageOutcome::failed(key, format!("{:#}", e)),
        };

        let outcome = transform::clean(&raw);

        for skip in &outcome.skips {
            info!(key, index = skip.index, reason = %skip.reason, "record skipped in transform");
        }

        if outcome.records.is_empty() {
            return PageOutcome {
                key: key.to_string(),
                status: PageStatus::Skipped("no canonical records after transform".to_string()),
                records_seen: raw.len(),
                records_skipped: outcome.skipped(),
                stats: LoadStats::default(),
            };
        }

        match self.loader.load(&outcome.records).await {
            Ok(stats) => PageOutcome {
                key: key.to_string(),
                status: PageStatus::Loaded,
                records_seen: raw.len(),
                records_skipped: outcome.skipped(),
                stats,
            },
            Err(e) => PageOutcome {
                key: key.to_string(),
                status: PageStatus::Failed(format!("{:#}", e)),
                records_seen: raw.len(),
                records_skipped: outcome.skipped(),
                stats: LoadStats::default(),
            },
        }
    }
}
