//! Upstream job-search API client
//!
//! Pages through the rate-limited search endpoint sequentially. Pagination is
//! strictly sequential per client so rate-limit accounting stays predictable;
//! concurrent queries must each hold their own client.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;

/// One raw upstream record, preserved as-is until transform
pub type RawRecord = serde_json::Value;

/// Result type for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;

/// Error types for the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    /// The 429 retry budget ran out; no further calls were made.
    #[error("rate limit retries exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    /// Any non-success, non-429 status is fatal for the current call.
    #[error("upstream returned status {status}")]
    Upstream { status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Response envelope of the search endpoint
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    data: Vec<RawRecord>,
}

/// HTTP client for the upstream job-search API
pub struct JobsApiClient {
    client: Client,
    config: UpstreamConfig,
}

impl JobsApiClient {
    /// Create a new client from configuration
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.api_host.is_empty() {
            return Err(FetchError::Config(
                "RAPIDAPI_KEY and RAPIDAPI_HOST must be set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("jobtrends-ingest/0.1")
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Delay inserted between successful page fetches
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.config.politeness_delay_ms)
    }

    /// Fetch a single page of raw records
    ///
    /// An empty result signals the end of pagination, not an error. HTTP 429
    /// responses are retried with backoff up to the configured attempt cap;
    /// any other non-success status fails immediately.
    pub async fn fetch_page(&self, page: u32, page_size: u32, query: &str) -> Result<Vec<RawRecord>> {
        let mut attempt = 0u32;

        loop {
            let response = self
                .client
                .get(&self.config.api_url)
                .header("X-RapidAPI-Key", &self.config.api_key)
                .header("X-RapidAPI-Host", &self.config.api_host)
                .query(&[("page", page.to_string()), ("page_size", page_size.to_string())])
                .query(&[("query", query)])
                .send()
                .await?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempt += 1;

                if attempt >= self.config.max_attempts {
                    warn!(page, attempts = attempt, "rate limit retries exhausted");
                    return Err(FetchError::RateLimitExhausted { attempts: attempt });
                }

                // A numeric Retry-After wins over the exponential schedule.
                let delay = match retry_after(&response) {
                    Some(server_delay) => {
                        debug!(page, delay_secs = server_delay.as_secs(), "honoring Retry-After");
                        server_delay
                    },
                    None => self.backoff_delay(attempt - 1),
                };

                warn!(
                    page,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Upstream {
                    status: status.as_u16(),
                });
            }

            let envelope: SearchEnvelope = response.json().await?;
            debug!(page, records = envelope.data.len(), "fetched page");
            return Ok(envelope.data);
        }
    }

    /// Fetch all pages for a query, stopping early on an empty page
    ///
    /// Returns one record vector per non-empty page, in page order, with the
    /// politeness delay inserted between successful calls.
    pub async fn fetch_all(
        &self,
        query: &str,
        page_size: u32,
        max_pages: u32,
    ) -> Result<Vec<Vec<RawRecord>>> {
        let mut pages = Vec::new();

        for page in 1..=max_pages {
            info!(page, query, "fetching page");
            let records = self.fetch_page(page, page_size, query).await?;

            if records.is_empty() {
                info!(page, "no more records, stopping pagination");
                break;
            }

            pages.push(records);

            if page < max_pages {
                tokio::time::sleep(self.politeness_delay()).await;
            }
        }

        info!(pages = pages.len(), query, "pagination complete");
        Ok(pages)
    }

    /// Exponential backoff with jitter: min(base * 2^attempt, cap) + uniform(0, base/2)
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base_ms;
        let cap = self.config.backoff_cap_secs * 1_000;
        let exp = base.saturating_mul(1u64 << attempt.min(32));
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(exp.min(cap) + jitter)
    }
}

/// Parse a numeric Retry-After header value, if present
fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
