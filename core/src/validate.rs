//! Structural validation of schema definitions.
//!
//! Catches defects that would otherwise surface as SQL errors halfway
//! through an upgrade: names that are not plain identifiers, duplicate
//! tables or columns, tables that would collide with the engine's
//! temporary migration names, and constraint combinations SQLite rejects.
//!
//! # Examples
//!
//! ```
//! use tableschema_core::*;
//!
//! let schema = SchemaDefinition::new("app", 1).with_table(
//!     TableDef::new("notes").with_column(ColumnDef::new("body", ColumnType::Text)),
//! );
//! assert!(validate_schema(&schema).is_empty());
//!
//! // Two tables with the same name
//! let dup = schema.clone().with_table(
//!     TableDef::new("notes").with_column(ColumnDef::new("x", ColumnType::Text)),
//! );
//! assert_eq!(
//!     validate_schema(&dup),
//!     vec![ValidationError::DuplicateTable("notes".to_string())]
//! );
//! ```

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::types::{
    ColumnType, HISTORY_TABLE, MIGRATION_SUFFIX, SQLITE_RESERVED_PREFIX, SchemaDefinition,
    TableDef,
};

/// Schema validation errors.
///
/// Each variant describes one structural problem. The `Display` impl
/// provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Database name is empty or whitespace-only.
    #[error("database name cannot be empty")]
    EmptyDatabaseName,
    /// Version is zero or does not fit SQLite's 32-bit `user_version`.
    #[error("version {0} out of range (must be between 1 and {max})", max = i32::MAX)]
    InvalidVersion(u32),
    /// A table or column name is not a plain SQL identifier.
    #[error("invalid identifier '{0}': must start with a letter or underscore and contain only ASCII letters, digits, and underscores")]
    InvalidIdentifier(String),
    /// Two tables share a name.
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    /// Two columns of the same table share a name.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },
    /// A table would be created without any column.
    #[error("table '{0}' has no columns")]
    EmptyTable(String),
    /// A table name collides with SQLite's or the engine's own tables.
    #[error("table name '{0}' is reserved")]
    ReservedTableName(String),
    /// A table is named like another table's temporary migration copy.
    #[error("table '{table}' collides with the migration name of table '{shadowed}'")]
    ShadowedTable { table: String, shadowed: String },
    /// More than one column of a table is a primary key.
    #[error("table '{0}' declares more than one primary key")]
    ConflictingPrimaryKey(String),
    /// `AUTOINCREMENT` on a column that is not an `INTEGER PRIMARY KEY`.
    #[error("column '{table}.{column}' uses AUTOINCREMENT but is not an INTEGER PRIMARY KEY")]
    InvalidAutoIncrement { table: String, column: String },
}

/// Returns `true` if `name` can be emitted unquoted in generated SQL.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Words SQLite's parser treats as keywords.
const SQL_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// Returns `true` if `name` is an SQLite keyword, in any case.
///
/// Keywords are valid table and column names but must be quoted in SQL.
pub fn is_sql_keyword(name: &str) -> bool {
    SQL_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

/// Validates a schema definition, returning every problem found.
///
/// An empty vector means the schema can be applied.
pub fn validate_schema(schema: &SchemaDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if schema.name.trim().is_empty() {
        errors.push(ValidationError::EmptyDatabaseName);
    }
    if schema.version == 0 || i64::from(schema.version) > i64::from(i32::MAX) {
        errors.push(ValidationError::InvalidVersion(schema.version));
    }

    // SQLite compares identifiers case-insensitively
    let declared: HashMap<String, &str> = schema
        .tables
        .iter()
        .map(|t| (t.name.to_ascii_lowercase(), t.name.as_str()))
        .collect();
    let mut seen: HashSet<String> = HashSet::new();

    for table in &schema.tables {
        let name = table.name.as_str();
        let folded = name.to_ascii_lowercase();
        if !is_plain_identifier(name) {
            errors.push(ValidationError::InvalidIdentifier(name.to_string()));
        }
        if !seen.insert(folded.clone()) {
            errors.push(ValidationError::DuplicateTable(name.to_string()));
            continue;
        }
        if folded == HISTORY_TABLE || folded.starts_with(SQLITE_RESERVED_PREFIX) {
            errors.push(ValidationError::ReservedTableName(name.to_string()));
        }
        if let Some(shadowed) = folded
            .strip_suffix(MIGRATION_SUFFIX)
            .and_then(|base| declared.get(base))
        {
            errors.push(ValidationError::ShadowedTable {
                table: name.to_string(),
                shadowed: shadowed.to_string(),
            });
        }
        errors.extend(validate_columns(table));
    }

    errors
}

fn validate_columns(table: &TableDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let physical = table.physical_columns();

    if physical.is_empty() {
        errors.push(ValidationError::EmptyTable(table.name.clone()));
        return errors;
    }

    let mut seen = HashSet::new();
    for column in &physical {
        if !is_plain_identifier(&column.name) {
            errors.push(ValidationError::InvalidIdentifier(column.name.clone()));
        }
        if !seen.insert(column.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
        if column.auto_increment && !(column.is_primary && column.column_type == ColumnType::Integer)
        {
            errors.push(ValidationError::InvalidAutoIncrement {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
    }

    if physical.iter().filter(|c| c.is_primary).count() > 1 {
        errors.push(ValidationError::ConflictingPrimaryKey(table.name.clone()));
    }

    errors
}
