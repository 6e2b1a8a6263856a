use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool ingests, aggregates, or emits data.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a snapshot cannot be parsed or a table cannot be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when the input directory cannot be traversed.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Raised when the identity column of a row does not hold a label.
    #[error("{}:{line}: column '{column}' must hold a name, found {found}", file.display())]
    MalformedRow {
        file: PathBuf,
        line: usize,
        column: String,
        found: String,
    },

    /// Raised when a numeric column holds something that is not a count.
    #[error("{}:{line}: invalid count '{value}' in column '{column}'", file.display())]
    InvalidNumber {
        file: PathBuf,
        line: usize,
        column: String,
        value: String,
    },

    /// Raised when a snapshot lacks a column its schema requires.
    #[error("{}: missing required column '{column}'", file.display())]
    MissingColumn { file: PathBuf, column: String },

    /// Raised when a snapshot date key is not in `YYYYMMDD` form.
    #[error("invalid snapshot date '{0}'")]
    InvalidDate(String),

    /// Raised when two snapshot files of the same family share a date.
    #[error("two snapshots for {date}: {} and {}", first.display(), second.display())]
    DuplicateSnapshot {
        date: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Raised when an entity name would be assigned twice.
    #[error("entity '{name}' appears more than once {context}")]
    DuplicateEntity { name: String, context: String },

    /// Raised when the exception table would make name resolution unstable.
    #[error("invalid exception table: {0}")]
    InvalidExceptionTable(String),

    /// Raised when the final entity count differs from the expected one.
    #[error("expected {expected} {kind} entities, found {found}")]
    EntityCount {
        kind: String,
        expected: usize,
        found: usize,
    },

    /// Raised when a series misses dates on which its category was reported.
    #[error(
        "series '{category}' of {entity} has {found} dates, the category was reported on {expected}"
    )]
    SeriesLength {
        entity: String,
        category: String,
        expected: usize,
        found: usize,
    },

    /// Raised when the user provides a path that does not exist.
    #[error("input path not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
