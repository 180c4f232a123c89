//! Error types shared by every pipeline stage.
//!
//! All variants are fatal to a run: nothing in the crate retries or
//! recovers a partial result.

use thiserror::Error;

/// Errors raised while acquiring, filtering, aggregating or writing data.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The server answered with a non-2xx status.
    #[error("GET {url} returned status {status}")]
    Network { url: String, status: u16 },

    /// Connection, TLS or timeout failure before a status was received.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The URL could not be parsed.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Payload did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required column is absent from a table.
    #[error("column '{column}' missing from {source_name}")]
    MissingColumn {
        column: String,
        source_name: String,
    },

    /// An expected input artifact does not exist.
    #[error("expected input file not found: {path}")]
    MissingFile { path: String },

    /// A geographic identifier does not fit its declared level.
    #[error("invalid geocode '{code}': expected {expected} characters")]
    InvalidGeocode { code: String, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Builds a [`PipelineError::MissingColumn`].
    pub fn missing_column(column: &str, source_name: &str) -> Self {
        PipelineError::MissingColumn {
            column: column.to_string(),
            source_name: source_name.to_string(),
        }
    }
}

/// Fails with [`PipelineError::MissingFile`] when `path` does not exist.
pub fn require_file(path: &std::path::Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingFile {
            path: path.display().to_string(),
        })
    }
}
