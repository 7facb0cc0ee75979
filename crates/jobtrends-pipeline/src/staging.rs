//! Durable staging for raw pages
//!
//! Raw pages land in an S3-compatible bucket under
//! `raw/<ISO-date>/page_<n>.json` before any normalization happens. Writes
//! are upsert-by-key, so re-staging the same page is idempotent. Pages are
//! written once and never mutated; the load phase reads them back verbatim.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::config::StagingConfig;
use crate::fetch::RawRecord;

/// Prefix under which all raw partitions live
pub const RAW_PREFIX: &str = "raw/";

/// Keyed blob persistence for raw pages
#[derive(Clone)]
pub struct StagingStore {
    client: Client,
    bucket: String,
}

impl StagingStore {
    /// Create a staging store from configuration
    pub fn new(config: &StagingConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            anyhow::bail!("staging bucket is not configured (S3_BUCKET_NAME)");
        }

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "jobtrends-staging",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, "staging store initialized");

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    /// Persist one raw page, returning its key
    ///
    /// Overwrite-safe: putting the same (date, page) twice writes the same
    /// key and is a no-op for downstream consumers.
    #[instrument(skip(self, records))]
    pub async fn put_page(
        &self,
        date: NaiveDate,
        page_index: u32,
        records: &[RawRecord],
    ) -> Result<String> {
        let key = page_key(date, page_index);
        let body = serde_json::to_vec(records).context("Failed to serialize raw page")?;

        debug!(key = %key, bytes = body.len(), "staging raw page");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("Failed to stage page to s3://{}/{}", self.bucket, key))?;

        info!(key = %key, records = records.len(), "staged raw page");

        Ok(key)
    }

    /// Read a staged page back as raw records
    #[instrument(skip(self))]
    pub async fn get_page(&self, key: &str) -> Result<Vec<RawRecord>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to read staged page s3://{}/{}", self.bucket, key))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read staged page body")?
            .into_bytes();

        let records: Vec<RawRecord> = serde_json::from_slice(&data)
            .with_context(|| format!("Staged page {} is not a JSON array of records", key))?;

        debug!(key, records = records.len(), "read staged page");

        Ok(records)
    }

    /// List all keys under a prefix
    ///
    /// Follows continuation tokens, so partitions larger than one listing
    /// page (1,000 keys) are returned in full.
    #[instrument(skip(self))]
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .with_context(|| format!("Failed to list s3://{}/{}", self.bucket, prefix))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|k| k.to_string())),
            );

            match response.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(keys)
    }

    /// Page keys under one partition, in page order
    pub async fn page_keys(&self, date: &str) -> Result<Vec<String>> {
        let mut keys = self.list(&format!("{}{}/", RAW_PREFIX, date)).await?;
        keys.sort();
        Ok(keys)
    }

    /// The most recent ingestion date with staged pages, if any
    ///
    /// ISO-8601 dates sort chronologically, so the lexicographic maximum of
    /// the date segments is the latest partition.
    pub async fn latest_partition(&self) -> Result<Option<String>> {
        let keys = self.list(RAW_PREFIX).await?;
        Ok(latest_partition_in(&keys))
    }
}

/// Key for one raw page: `raw/<date>/page_<n>.json`
pub fn page_key(date: NaiveDate, page_index: u32) -> String {
    format!("{}{}/page_{}.json", RAW_PREFIX, date.format("%Y-%m-%d"), page_index)
}

/// Extract the date segment of a raw-page key
fn partition_of(key: &str) -> Option<&str> {
    key.strip_prefix(RAW_PREFIX)?.split('/').next().filter(|s| !s.is_empty())
}

/// Lexicographically greatest partition among the given keys
fn latest_partition_in(keys: &[String]) -> Option<String> {
    keys.iter()
        .filter_map(|k| partition_of(k))
        .max()
        .map(|s| s.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_key_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(page_key(date, 1), "raw/2024-01-03/page_1.json");
        assert_eq!(page_key(date, 12), "raw/2024-01-03/page_12.json");
    }

    #[test]
    fn test_partition_of() {
        assert_eq!(partition_of("raw/2024-01-03/page_1.json"), Some("2024-01-03"));
        assert_eq!(partition_of("other/2024-01-03/page_1.json"), None);
        assert_eq!(partition_of("raw/"), None);
    }

    #[test]
    fn test_latest_partition_picks_greatest_date() {
        let keys = vec![
            "raw/2024-01-01/page_1.json".to_string(),
            "raw/2024-01-03/page_1.json".to_string(),
            "raw/2024-01-02/page_1.json".to_string(),
            "raw/2024-01-02/page_2.json".to_string(),
        ];
        assert_eq!(latest_partition_in(&keys), Some("2024-01-03".to_string()));
    }

    #[test]
    fn test_latest_partition_empty() {
        assert_eq!(latest_partition_in(&[]), None);
    }
}
