//! Error types for jobtrends

use thiserror::Error;

/// Result type alias for jobtrends operations
pub type Result<T> = std::result::Result<T, JobtrendsError>;

/// Main error type for jobtrends
#[derive(Error, Debug)]
pub enum JobtrendsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = JobtrendsError::Config("S3_BUCKET_NAME is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: S3_BUCKET_NAME is not set"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: JobtrendsError = io.into();
        assert!(matches!(err, JobtrendsError::Io(_)));
    }
}
