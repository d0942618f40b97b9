//! Live database introspection.
//!
//! [`Store`] is the seam between the migration engine and the database: it
//! lists user tables, lists a table's columns, and executes one statement at
//! a time. The engine only talks to a `Store`, so a test can wrap a real
//! connection and inject failures at any step.

use rusqlite::Connection;
use rusqlite::types::Value;
use tableschema_core::HISTORY_TABLE;
use tracing::debug;

use crate::ddl::quote_ident;
use crate::error::{Result, SqliteError};

/// The operations the migration engine needs from a database.
pub trait Store {
    /// User table names, sorted, excluding SQLite's own `sqlite_*` tables
    /// and the engine's bookkeeping table.
    fn table_names(&self) -> Result<Vec<String>>;

    /// Column names of `table` in declaration order.
    ///
    /// Fails with [`SqliteError::TableNotFound`] if the table does not exist.
    fn column_names(&self, table: &str) -> Result<Vec<String>>;

    /// Executes one statement that returns no rows, returning the number of
    /// rows it changed.
    fn execute_statement(&self, sql: &str) -> Result<usize>;

    /// Returns `true` if `table` is a user table.
    fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.table_names()?.iter().any(|t| t == table))
    }

    /// Returns `true` if `table` has a column named `column`.
    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.column_names(table)?.iter().any(|c| c == column))
    }
}

impl Store for Connection {
    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.prepare(
            r"SELECT name FROM sqlite_master
              WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\' AND name <> ?1
              ORDER BY name",
        )?;
        let names = stmt
            .query_map([HISTORY_TABLE], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        if names.is_empty() {
            return Err(SqliteError::TableNotFound(table.to_string()));
        }
        Ok(names)
    }

    fn execute_statement(&self, sql: &str) -> Result<usize> {
        debug!(sql, "executing statement");
        Ok(self.execute(sql, [])?)
    }
}

/// Values of one column in row order.
///
/// # Errors
///
/// Returns [`SqliteError::TableNotFound`] or [`SqliteError::ColumnNotFound`]
/// for unknown names.
pub fn column_values(conn: &Connection, table: &str, column: &str) -> Result<Vec<Value>> {
    if !conn.has_column(table, column)? {
        return Err(SqliteError::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        });
    }
    let sql = format!(
        "SELECT {} FROM {} ORDER BY rowid",
        quote_ident(column),
        quote_ident(table)
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<Value>, _>>()?;
    Ok(values)
}

/// Number of rows in `table`.
pub fn row_count(conn: &Connection, table: &str) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(count as usize)
}
