//! I/O error types for astrobit-io.

use std::path::PathBuf;

/// Errors from request parsing, feature preparation, and artifact loading.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the record table is not an array of JSON objects.
    #[error("invalid record table: {reason}")]
    InvalidTable {
        /// What was wrong with the table.
        reason: String,
    },

    /// Returned when the column mapping is not an object of column names.
    #[error("invalid column mapping: {reason}")]
    InvalidMapping {
        /// What was wrong with the mapping.
        reason: String,
    },

    /// Returned when a feature schema is empty.
    #[error("feature schema has no features")]
    EmptySchema,

    /// Returned when a feature schema names the same feature twice.
    #[error("feature \"{name}\" appears more than once in the schema")]
    DuplicateFeature {
        /// The repeated feature name.
        name: String,
    },

    /// Returned when a matrix row has a different width than the matrix.
    #[error("row {row_index} has {got} columns, expected {expected}")]
    RowWidth {
        /// Zero-based row index.
        row_index: usize,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns in the row.
        got: usize,
    },

    /// Returned when a processed matrix cell is NaN or infinite.
    #[error("non-finite value at row {row_index}, column {col_index}")]
    NonFiniteValue {
        /// Zero-based row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
    },

    /// Returned when scaler parameters are unusable.
    #[error("invalid scaler parameters: {reason}")]
    InvalidScaler {
        /// What was wrong with the parameters.
        reason: String,
    },

    /// Returned when the matrix width differs from the scaler's parameter count.
    #[error("matrix has {got} columns but the scaler was fit on {expected} features")]
    ScalerDimensionMismatch {
        /// Number of scaler parameters.
        expected: usize,
        /// Number of matrix columns.
        got: usize,
    },

    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a JSON file cannot be parsed.
    #[error("JSON parse error in {path}")]
    JsonParse {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

impl IoError {
    /// Return `true` when the error means a file could not be found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IoError::FileNotFound { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
