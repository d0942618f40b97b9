//! Error types for schema definition access and parsing.

use thiserror::Error;

use crate::validate::ValidationError;

/// Errors raised while parsing a schema source or looking up its contents.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A lookup named a table the schema does not declare.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A table lookup by position was outside `0..count`.
    #[error("table index {index} out of range (schema declares {count} tables)")]
    TableIndexOutOfRange { index: usize, count: usize },

    /// A column lookup by position was outside `0..count`.
    #[error("column index {index} out of range for table '{table}' ({count} columns)")]
    ColumnIndexOutOfRange {
        table: String,
        index: usize,
        count: usize,
    },

    /// A column declared a type string that maps to no known column type.
    #[error("unsupported column type '{declared}' for column '{table}.{column}'")]
    UnsupportedColumnType {
        table: String,
        column: String,
        declared: String,
    },

    /// The schema source is not well-formed JSON or is missing required fields.
    #[error("parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The schema parsed but violates one or more structural rules.
    #[error("invalid schema: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
