//! Error types for SQLite schema operations.
//!
//! Provides a unified error type covering database access, introspection,
//! schema loading, migration steps, and row conversion failures.

use std::fmt;

use thiserror::Error;

/// The kind of statement a migration step was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Listing a table's columns.
    Introspect,
    Create,
    Drop,
    /// Moving a table aside under its temporary name.
    Rename,
    /// Copying preserved columns into the rebuilt table.
    Copy,
    /// Writing the bookkeeping row and version bump.
    RecordHistory,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Introspect => "introspect",
            Self::Create => "create",
            Self::Drop => "drop",
            Self::Rename => "rename",
            Self::Copy => "copy data into",
            Self::RecordHistory => "record history for",
        })
    }
}

/// Errors that can occur during SQLite schema operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Introspection named a table that does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Introspection named a column the table does not have.
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// The declared schema is invalid or a lookup into it failed.
    #[error("schema error: {0}")]
    SchemaError(#[from] tableschema_core::SchemaError),

    /// Error loading schemas or configuration.
    #[error("loader error: {0}")]
    LoaderError(#[from] tableschema_db::DatabaseError),

    /// A migration step failed; the surrounding transaction was rolled back.
    #[error("failed to {operation} table '{table}': {source}")]
    StepFailed {
        operation: Operation,
        table: String,
        source: Box<SqliteError>,
    },

    /// The database is newer than the schema being opened.
    #[error(
        "database '{database}' is at version {current}, newer than requested version {requested}"
    )]
    Downgrade {
        database: String,
        current: u32,
        requested: u32,
    },

    /// A value could not be converted between JSON and SQL.
    #[error("conversion error: {0}")]
    ConversionError(String),
}

impl SqliteError {
    /// Wraps `self` with the table and operation it interrupted.
    pub(crate) fn in_step(self, operation: Operation, table: &str) -> Self {
        Self::StepFailed {
            operation,
            table: table.to_string(),
            source: Box::new(self),
        }
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
