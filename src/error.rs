use std::path::PathBuf;

use thiserror::Error;

/// Why the dataset could not be loaded. Fatal for every session: the page
/// shows the message instead of the dashboard.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{}: missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("row {row}: cannot read {column} from '{value}'")]
    Coercion {
        row: usize,
        column: String,
        value: String,
    },

    #[error("{0}")]
    Malformed(String),
}

/// A filter combination that matches no rows. Rendered as an empty state,
/// never returned as a failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("no transactions match the current filters ({dataset_rows} rows in dataset)")]
pub struct EmptySelectionWarning {
    pub dataset_rows: usize,
}

/// A query-string value that does not parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("'{value}' is not a valid date for '{field}' (expected YYYY-MM-DD)")]
    InvalidDate { field: String, value: String },

    #[error("'{value}' is not a valid amount for '{field}'")]
    InvalidAmount { field: String, value: String },

    #[error("n-gram size must be 1, 2 or 3, got '{0}'")]
    InvalidNgram(String),

    #[error("'{0}' is not a valid shuffle seed")]
    InvalidSeed(String),
}
