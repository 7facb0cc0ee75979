//! Logging configuration and initialization
//!
//! Centralized tracing setup for all jobtrends binaries. Components never
//! call `println!`; they emit structured events through `tracing` and this
//! module decides where those events go.
//!
//! Configuration comes from environment variables:
//!
//! - `LOG_LEVEL`: default level filter (trace, debug, info, warn, error)
//! - `LOG_FORMAT`: `text` (default) or `json`
//! - `LOG_DIR`: when set, also write daily-rotated files into this directory
//! - `LOG_FILE_PREFIX`: log file name prefix (default "jobtrends")
//! - `RUST_LOG`-style directives may be embedded in `LOG_LEVEL`
//!   (e.g. "info,sqlx=warn,hyper=warn")

use std::path::PathBuf;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{JobtrendsError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level filter, optionally with per-module directives
    pub level: String,

    /// Emit JSON instead of human-readable text
    pub json: bool,

    /// Directory for daily-rotated log files; console-only when None
    pub log_dir: Option<PathBuf>,

    /// Log file name prefix (e.g. "jobtrends" -> "jobtrends.2024-01-18.log")
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
            file_prefix: "jobtrends".to_string(),
        }
    }
}

impl LogConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.level = level;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.json = format.eq_ignore_ascii_case("json");
        }

        if let Ok(dir) = std::env::var("LOG_DIR") {
            config.log_dir = Some(PathBuf::from(dir));
        }

        if let Ok(prefix) = std::env::var("LOG_FILE_PREFIX") {
            config.file_prefix = prefix;
        }

        config
    }

    /// Override the level filter
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Initialize the global tracing subscriber
///
/// Should be called exactly once at process startup, before any component
/// constructors run.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| JobtrendsError::Config(format!("invalid LOG_LEVEL '{}': {}", config.level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);

    match &config.log_dir {
        None => {
            let console = fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);

            if config.json {
                registry.with(console.json()).try_init()
            } else {
                registry.with(console).try_init()
            }
        },
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            let file_appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // The guard must outlive the process for buffered events to flush;
            // leak it for the application lifetime.
            std::mem::forget(guard);

            if config.json {
                let console = fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE);
                let file = fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_ansi(false);
                registry.with(console.json()).with(file.json()).try_init()
            } else {
                let console = fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE);
                let file = fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_ansi(false);
                registry.with(console).with(file).try_init()
            }
        },
    }
    .map_err(|e| JobtrendsError::Config(format!("failed to install tracing subscriber: {}", e)))
}
