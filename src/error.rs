//! Custom error types for rustbiblio.
//!
//! This module defines all error types used throughout the library.
//! All functions return `Result<T, BiblioError>` instead of using `unwrap()`.

use std::fmt;
use thiserror::Error;

/// Pipeline stage that talked to the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Per-chunk partial summary
    Map,
    /// Final synthesis over all partial summaries
    Reduce,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Map => write!(f, "map"),
            Stage::Reduce => write!(f, "reduce"),
        }
    }
}

/// Renders the optional chunk index as ` (chunk N)` for error messages.
struct ChunkSuffix<'a>(&'a Option<usize>);

impl fmt::Display for ChunkSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(idx) => write!(f, " (chunk {})", idx),
            None => Ok(()),
        }
    }
}

/// Main error type for rustbiblio operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum BiblioError {
    /// Empty or whitespace-only input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Chunk size / overlap / concurrency out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Transient provider failure (rate limit, timeout, 5xx)
    #[error("Retryable provider error in {stage} stage{}: {message}", ChunkSuffix(.chunk_index))]
    RetryableProvider {
        stage: Stage,
        chunk_index: Option<usize>,
        message: String,
    },

    /// Permanent provider failure (auth, malformed request)
    #[error("Fatal provider error in {stage} stage{}: {message}", ChunkSuffix(.chunk_index))]
    FatalProvider {
        stage: Stage,
        chunk_index: Option<usize>,
        message: String,
    },

    /// Run aborted by the caller before the reduce stage
    #[error("Summarization cancelled")]
    Cancelled,

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Excel export error
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl BiblioError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BiblioError::RetryableProvider { .. } | BiblioError::RateLimited(_)
        )
    }
}

/// Result type alias using `BiblioError`
pub type Result<T> = std::result::Result<T, BiblioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display_includes_context() {
        let err = BiblioError::RetryableProvider {
            stage: Stage::Map,
            chunk_index: Some(3),
            message: "429 Too Many Requests".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Retryable provider error in map stage (chunk 3): 429 Too Many Requests"
        );
        assert!(err.is_retryable());

        let err = BiblioError::FatalProvider {
            stage: Stage::Reduce,
            chunk_index: None,
            message: "401 Unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Fatal provider error in reduce stage: 401 Unauthorized"
        );
        assert!(!err.is_retryable());
    }
}
