//! Jobtrends Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the jobtrends workspace.
//!
//! # Overview
//!
//! This crate provides the ambient plumbing used across workspace members:
//!
//! - **Error Handling**: the [`JobtrendsError`] type and [`Result`] alias
//! - **Logging**: tracing subscriber setup via [`logging::init_logging`]
//!
//! # Example
//!
//! ```no_run
//! use jobtrends_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> jobtrends_common::Result<()> {
//!     init_logging(&LogConfig::from_env())?;
//!     tracing::info!("pipeline starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{JobtrendsError, Result};
