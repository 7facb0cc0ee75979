//! Idempotent, transactional loading into the relational schema
//!
//! Two tables: `jobs` (one row per posting, append-only) and `job_skills`
//! (one row per (job_id, skill) pair). A load reads the set of already
//! present job ids, inserts only the new ones, and restricts skill edges to
//! those new ids, all inside one transaction. Uniqueness is additionally
//! store-enforced (primary key + unique pair constraint) with
//! insert-ignore-on-conflict, which narrows the window left by the
//! check-then-insert protocol under concurrent loaders.

use std::collections::HashSet;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::transform::CanonicalJobRecord;

/// Writer for the jobs/job_skills schema
#[derive(Clone)]
pub struct JobLoader {
    db: PgPool,
}

/// Row counts from one load call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// New rows inserted into `jobs`
    pub jobs_inserted: u64,
    /// New rows inserted into `job_skills`
    pub skills_inserted: u64,
    /// Incoming records whose job_id was already loaded (no-op)
    pub jobs_skipped: u64,
    /// Inserts swallowed by the uniqueness constraint despite the pre-check
    pub conflicts: u64,
}

impl JobLoader {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the jobs/job_skills tables if they do not exist
    ///
    /// Bootstrap only; the constraints here are what makes conflict-ignoring
    /// inserts safe.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id      TEXT PRIMARY KEY,
                title       TEXT,
                company     TEXT,
                location    TEXT,
                salary_min  DOUBLE PRECISION NOT NULL,
                salary_max  DOUBLE PRECISION NOT NULL,
                avg_salary  DOUBLE PRECISION NOT NULL,
                date_posted DATE NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await
        .context("Failed to create jobs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_skills (
                job_id TEXT NOT NULL REFERENCES jobs(job_id),
                skill  TEXT NOT NULL,
                UNIQUE (job_id, skill)
            )
            "#,
        )
        .execute(&self.db)
        .await
        .context("Failed to create job_skills table")?;

        Ok(())
    }

    /// Load a canonical batch, inserting only job ids not yet present
    ///
    /// Re-running on an unchanged batch inserts zero rows. The existence
    /// read, jobs insert, and job_skills insert share one transaction, so a
    /// crash mid-load leaves no job row without its skill rows.
    #[instrument(skip(self, records), fields(batch = records.len()))]
    pub async fn load(&self, records: &[CanonicalJobRecord]) -> Result<LoadStats> {
        let mut stats = LoadStats::default();

        if records.is_empty() {
            return Ok(stats);
        }

        let mut tx = self.db.begin().await.context("Failed to begin transaction")?;

        let existing: HashSet<String> = sqlx::query_scalar("SELECT job_id FROM jobs")
            .fetch_all(&mut *tx)
            .await
            .context("Failed to read existing job ids")?
            .into_iter()
            .collect();

        debug!(existing = existing.len(), "read existing job ids");

        // Dedup within the batch as well: the same posting can appear on
        // more than one staged page.
        let mut inserted_in_batch: HashSet<&str> = HashSet::new();

        for record in records {
            if existing.contains(&record.job_id) || inserted_in_batch.contains(record.job_id.as_str())
            {
                stats.jobs_skipped += 1;
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT INTO jobs
                    (job_id, title, company, location, salary_min, salary_max, avg_salary, date_posted)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (job_id) DO NOTHING
                "#,
            )
            .bind(&record.job_id)
            .bind(&record.title)
            .bind(&record.company)
            .bind(&record.location)
            .bind(record.salary_min)
            .bind(record.salary_max)
            .bind(record.avg_salary)
            .bind(record.date_posted)
            .execute(&mut *tx)
            .await
            .context("Failed to insert job row")?;

            if result.rows_affected() == 0 {
                // Another loader won the race between our read and this
                // insert; benign, counted, never retried.
                warn!(job_id = %record.job_id, "job row already present despite pre-check");
                stats.conflicts += 1;
                continue;
            }

            inserted_in_batch.insert(&record.job_id);
            stats.jobs_inserted += 1;

            // skills is a set, so pairs are already unique per record
            for skill in &record.skills {
                let result = sqlx::query(
                    "INSERT INTO job_skills (job_id, skill) VALUES ($1, $2) \
                     ON CONFLICT (job_id, skill) DO NOTHING",
                )
                .bind(&record.job_id)
                .bind(skill)
                .execute(&mut *tx)
                .await
                .context("Failed to insert job skill row")?;

                if result.rows_affected() == 0 {
                    warn!(job_id = %record.job_id, skill = %skill, "skill pair already present");
                    stats.conflicts += 1;
                } else {
                    stats.skills_inserted += 1;
                }
            }
        }

        tx.commit().await.context("Failed to commit load transaction")?;

        info!(
            jobs_inserted = stats.jobs_inserted,
            skills_inserted = stats.skills_inserted,
            jobs_skipped = stats.jobs_skipped,
            conflicts = stats.conflicts,
            "load complete"
        );

        Ok(stats)
    }
}
