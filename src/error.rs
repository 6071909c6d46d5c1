//! Error types for Groundstroke

use thiserror::Error;

/// Errors that can end a scoring run
///
/// Recoverable conditions (non-numeric rally cells, zero-variance task groups,
/// athletes missing a module) are handled inside the pipeline and never
/// surface here.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Missing column for {module} {field}: {binding} (table has {width} columns)")]
    MissingColumn {
        module: &'static str,
        field: &'static str,
        binding: String,
        width: usize,
    },

    #[error("Invalid delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

impl ScoreError {
    /// True for the failures that mean the uploaded table does not match the contract
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            ScoreError::MalformedInput(_) | ScoreError::MissingColumn { .. } | ScoreError::Csv(_)
        )
    }
}
