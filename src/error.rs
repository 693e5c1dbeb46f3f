//! Error types for the churn pipeline
//!
//! Library code returns [`ChurnError`]. Orchestration and the CLI wrap these
//! in `anyhow` with additional context.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for churnkit operations
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Errors raised by the transformation, training and inference stages
#[derive(Error, Debug)]
pub enum ChurnError {
    /// A configured column is absent from the dataset or record
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// A column exists but has the wrong type or shape for the operation
    #[error("Schema mismatch in column '{column}': {reason}")]
    SchemaMismatch { column: String, reason: String },

    /// A categorical value has no entry in the fitted or configured mapping
    #[error("Unmapped value '{value}' in column '{column}'")]
    UnmappedCategory { column: String, value: String },

    /// A numeric value falls outside the configured bin edges
    #[error("Value {value} in column '{column}' is outside bin range [{lower}, {upper}]")]
    OutOfRange {
        column: String,
        value: f64,
        lower: f64,
        upper: f64,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An inference record is missing a field or carries a bad value
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A required artifact file does not exist
    #[error("Missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// A transformer or model was used before being fitted
    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    /// An inference request exceeded its deadline
    #[error("Prediction timed out after {0:?}")]
    Timeout(Duration),

    /// A worker stopped without reporting a result
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Data error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChurnError {
    pub(crate) fn schema(column: &str, reason: impl Into<String>) -> Self {
        ChurnError::SchemaMismatch {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
