// Error types for the sonification pipeline.
//
// Validation failures (missing columns, out-of-range parameters, empty
// input) are raised before any per-sample work begins. `DateLookupMiss` is
// the one recoverable kind: the ephemeris estimator catches it and falls
// back to a modelled solar day, so it never escapes a conversion.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for sonification operations.
pub type Result<T> = std::result::Result<T, SonifyError>;

#[derive(Error, Debug)]
pub enum SonifyError {
    /// A required input column is absent from the sample table.
    #[error("missing required column: {0:?}")]
    MissingColumn(String),

    /// A run parameter is outside its documented bounds.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The sample table has no rows, so no beat grid can be laid out.
    #[error("input contains no samples")]
    EmptyInput,

    /// No measured sunrise/sunset entry exists for the date.
    #[error("no measured solar data for {0}")]
    DateLookupMiss(NaiveDate),

    /// The note-event container could not be encoded or written.
    #[error("serialization failed: {0}")]
    SerializationFailure(String),

    /// A cell could not be parsed into the type its column requires.
    #[error("malformed value {value:?} in column {column:?} at row {row}")]
    MalformedValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
