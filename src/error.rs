//! Error types for the deva library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DevaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value '{value}' at row {row}, column {col}")]
    InvalidValue {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Unsupported file format '{0}': expected .tsv, .txt or .csv")]
    UnsupportedFormat(String),

    #[error("Invalid configuration for '{parameter}': {constraint}")]
    Configuration {
        parameter: String,
        constraint: String,
    },

    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DevaError {
    /// Shorthand for a configuration error naming the offending parameter.
    pub fn config(parameter: &str, constraint: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.to_string(),
            constraint: constraint.into(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DevaError>;
