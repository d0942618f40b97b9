//! SQL statement generation from table definitions.
//!
//! Pure functions: every generator returns statement text and touches no
//! connection. Statements carry no trailing semicolon so each one can be
//! passed to a single-statement `execute` call.
//!
//! Column clauses render constraints in a fixed order, `PRIMARY KEY`, then
//! `AUTOINCREMENT`, then `NOT NULL`, then `DEFAULT`, since SQLite only
//! accepts `AUTOINCREMENT` directly after `PRIMARY KEY`.
//!
//! # Example
//!
//! ```
//! use tableschema_core::*;
//! use tableschema_sqlite::ddl;
//!
//! let table = TableDef::new("TestTable")
//!     .with_auto_primary_key()
//!     .with_column(ColumnDef::new("column1", ColumnType::Text).not_null());
//!
//! assert_eq!(
//!     ddl::create_table_sql(&table),
//!     "CREATE TABLE IF NOT EXISTS TestTable (_id INTEGER PRIMARY KEY AUTOINCREMENT, column1 TEXT NOT NULL)"
//! );
//! assert_eq!(ddl::drop_table_sql("TestTable"), "DROP TABLE IF EXISTS TestTable");
//! ```

use std::borrow::Cow;

use tableschema_core::{
    ColumnDef, MIGRATION_SUFFIX, SchemaDefinition, TableDef, is_plain_identifier, is_sql_keyword,
};

/// Renders an identifier for SQL.
///
/// Plain identifiers come back unchanged. Keywords and anything else are
/// wrapped in double quotes with embedded quotes doubled.
pub fn quote_ident(name: &str) -> Cow<'_, str> {
    if is_plain_identifier(name) && !is_sql_keyword(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

/// Name a table is moved to while it is being rebuilt.
pub fn temp_table_name(table: &str) -> String {
    format!("{table}{MIGRATION_SUFFIX}")
}

/// Renders one column clause of a `CREATE TABLE` statement.
pub fn column_clause(column: &ColumnDef) -> String {
    let mut clause = format!(
        "{} {}",
        quote_ident(&column.name),
        column.column_type.sql_keyword()
    );
    if column.is_primary {
        clause.push_str(" PRIMARY KEY");
    }
    if column.auto_increment {
        clause.push_str(" AUTOINCREMENT");
    }
    if column.not_null {
        clause.push_str(" NOT NULL");
    }
    if let Some(default) = column.default_value.as_deref() {
        clause.push_str(" DEFAULT ");
        clause.push_str(default);
    }
    clause
}

/// `CREATE TABLE IF NOT EXISTS` for the table's physical columns.
pub fn create_table_sql(table: &TableDef) -> String {
    let columns = table
        .physical_columns()
        .iter()
        .map(|c| column_clause(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_ident(&table.name)
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn rename_table_sql(from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_ident(from),
        quote_ident(to)
    )
}

/// Copies `columns` from `source` into `table`, in the order given.
pub fn copy_columns_sql<S: AsRef<str>>(table: &str, source: &str, columns: &[S]) -> String {
    let list = columns
        .iter()
        .map(|c| quote_ident(c.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({list}) SELECT {list} FROM {}",
        quote_ident(table),
        quote_ident(source)
    )
}

/// One `CREATE TABLE` statement per declared table, in declaration order.
pub fn create_statements(schema: &SchemaDefinition) -> Vec<String> {
    schema.tables.iter().map(create_table_sql).collect()
}

/// The whole schema as a script, each statement terminated by `;`.
pub fn create_schema_sql(schema: &SchemaDefinition) -> String {
    create_statements(schema)
        .iter()
        .map(|statement| format!("{statement};\n"))
        .collect()
}
