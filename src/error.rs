use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Convenience result type used across the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by acquisition, normalization and publishing.
///
/// Orchestrators never let these escape a unit: they are downgraded to a
/// [`crate::types::UnitResult`] at the unit boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Excel workbook read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Excel workbook write error (feature-gated behind `excel`).
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// HTTP transport error while acquiring a source file.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error, e.g. in a configuration or mapping file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The download watcher gave up before a completed file appeared.
    #[error("timeout: no completed download in '{}' after {waited:?}", dir.display())]
    Timeout { dir: PathBuf, waited: Duration },

    /// The raw file contains no parseable table.
    #[error("missing table: {message}")]
    MissingTable { message: String },

    /// The table exists but lacks the expected columns.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// An acquisition action could not trigger or complete its download.
    #[error("acquisition failed: {message}")]
    Action { message: String },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Unexpected failure surfacing from a unit's internals.
    #[error("unit '{unit}' crashed: {message}")]
    Crash { unit: String, message: String },
}

impl PipelineError {
    pub(crate) fn action(message: impl Into<String>) -> Self {
        Self::Action {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
