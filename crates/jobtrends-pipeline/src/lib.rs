//! Jobtrends Pipeline Library
//!
//! Ingestion pipeline for job-posting analytics: fetch paginated data from a
//! rate-limited search API, stage raw pages durably in S3, normalize the
//! heterogeneous records, and load canonical rows into Postgres for the
//! read-only dashboard.
//!
//! # Components
//!
//! - [`fetch`]: paginated HTTP client with rate-limit backoff
//! - [`staging`]: keyed blob persistence for raw pages
//! - [`transform`]: pure normalization into canonical records
//! - [`load`]: idempotent, transactional writes into jobs/job_skills
//! - [`orchestrator`]: batch and event-driven drivers
//!
//! # Example
//!
//! ```no_run
//! use jobtrends_pipeline::config::Config;
//! use jobtrends_pipeline::load::JobLoader;
//! use jobtrends_pipeline::orchestrator::Orchestrator;
//! use jobtrends_pipeline::staging::StagingStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let staging = StagingStore::new(&config.staging)?;
//!     let loader = JobLoader::new(config.database.connect().await?);
//!     let report = Orchestrator::new(staging, loader).run_batch(None).await?;
//!     println!("inserted {} jobs", report.jobs_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fetch;
pub mod load;
pub mod orchestrator;
pub mod staging;
pub mod transform;

// Re-export main types
pub use config::Config;
pub use fetch::{FetchError, JobsApiClient, RawRecord};
pub use load::{JobLoader, LoadStats};
pub use orchestrator::{BatchReport, IngestReport, Orchestrator, PageOutcome, PageStatus};
pub use staging::StagingStore;
pub use transform::{CanonicalJobRecord, SkillsField, TransformOutcome, TransformSkip};
