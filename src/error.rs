use std::fmt;

use thiserror::Error;

/// Convenience result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Error type returned by conversion functions.
///
/// This is a single error enum shared by the table readers, the schema/mapping loaders and the
/// document builder.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel reader error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV reader error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization or mapping-file parse error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schema (`.dt`) file could not be read or understood.
    #[error("failed to load schema '{path}': {message}")]
    SchemaLoad { path: String, message: String },

    /// A mapping file could not be read or understood.
    #[error("failed to load mapping '{path}': {message}")]
    MappingLoad { path: String, message: String },

    /// A target path is not a dot-separated sequence of non-empty segments.
    #[error("invalid target path '{path}': {message}")]
    InvalidTargetPath { path: String, message: String },

    /// Two target paths cannot coexist in one document (leaf vs. object, or exact duplicate).
    #[error("mapping conflict between target paths '{path_a}' and '{path_b}'")]
    MappingConflict { path_a: String, path_b: String },

    /// A mapped source column is absent from the table header (strict column checking only).
    #[error("mapped source column '{column}' not found in table header")]
    MissingSourceColumn { column: String },

    /// A cell could not be coerced to its declared type (strict mode only).
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The input is structurally unusable (unsupported format, no header row, ...).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

/// Why a cell could not be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoercionErrorKind {
    /// The value cannot represent the declared type (e.g. `"abc"` as integer).
    TypeMismatch,
    /// The value is not a recognizable, unambiguous date.
    UnparseableDate,
}

impl fmt::Display for CoercionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch => f.write_str("type mismatch"),
            Self::UnparseableDate => f.write_str("unparseable date"),
        }
    }
}

/// A per-cell coercion failure, attributed to its row and source column.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "failed to coerce value at row {row_index} column '{source_column}' to '{target_path}': {kind} (raw='{raw_value}')"
)]
pub struct CoercionError {
    pub kind: CoercionErrorKind,
    /// 0-based position of the row in the sequence handed to the builder.
    pub row_index: usize,
    pub source_column: String,
    pub target_path: String,
    pub raw_value: String,
}
