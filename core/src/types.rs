//! Schema type definitions for declarative table modeling.
//!
//! A database schema is plain data: a [`SchemaDefinition`] names the
//! database, carries its version, and lists [`TableDef`]s, each of which
//! lists [`ColumnDef`]s. The types serialize with [`serde`] using the
//! camelCase field names of the JSON schema source format.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::error::{Result, SchemaError};

/// Name of the column added to tables that request an automatic primary key.
pub const AUTO_PRIMARY_KEY_COLUMN: &str = "_id";

/// Name of the bookkeeping table the migration engine keeps in every
/// managed database. Never reported as a user table.
pub const HISTORY_TABLE: &str = "tableschema_history";

/// Suffix appended to a table's name while it is being migrated.
pub const MIGRATION_SUFFIX: &str = "_old";

/// Prefix SQLite reserves for its own catalog tables.
pub const SQLITE_RESERVED_PREFIX: &str = "sqlite_";

/// A type string that maps to none of the canonical column types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized column type '{0}'")]
pub struct UnknownColumnType(pub String);

/// Storage type of a column.
///
/// Source documents may use any of several aliases, matched
/// case-insensitively:
///
/// | Alias                        | Type      |
/// |------------------------------|-----------|
/// | `integer`, `int`             | `Integer` |
/// | `text`, `string`             | `Text`    |
/// | `real`, `float`, `double`    | `Real`    |
///
/// # Examples
///
/// ```
/// use tableschema_core::ColumnType;
///
/// assert_eq!("INT".parse::<ColumnType>().unwrap(), ColumnType::Integer);
/// assert_eq!("Double".parse::<ColumnType>().unwrap(), ColumnType::Real);
/// assert_eq!(ColumnType::Text.sql_keyword(), "TEXT");
/// assert!("varchar".parse::<ColumnType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Text,
    Real,
}

impl ColumnType {
    /// Returns the SQL keyword emitted in `CREATE TABLE` statements.
    pub fn sql_keyword(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
        }
    }

    /// Returns the canonical lowercase name used when serializing.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Real => "real",
        }
    }
}

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "text" | "string" => Ok(Self::Text),
            "real" | "float" | "double" => Ok(Self::Real),
            _ => Err(UnknownColumnType(raw.to_string())),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = UnknownColumnType;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single column.
///
/// Constraint flags are rendered in a fixed order by the DDL generator:
/// `PRIMARY KEY`, `AUTOINCREMENT`, `NOT NULL`, then `DEFAULT`.
///
/// # Examples
///
/// ```
/// use tableschema_core::{ColumnDef, ColumnType};
///
/// let id = ColumnDef::new("id", ColumnType::Integer).primary_key().auto_increment();
/// assert!(id.is_primary && id.auto_increment);
///
/// let status = ColumnDef::new("status", ColumnType::Text).not_null().with_default("'new'");
/// assert_eq!(status.default_value.as_deref(), Some("'new'"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub not_null: bool,
    /// Raw SQL default expression. Absent and empty both mean "no default".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub default_value: Option<String>,
}

impl ColumnDef {
    /// Creates a nullable column with no constraints.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_primary: false,
            auto_increment: false,
            not_null: false,
            default_value: None,
        }
    }

    /// The implicit `_id INTEGER PRIMARY KEY AUTOINCREMENT` column.
    pub fn auto_primary_key() -> Self {
        Self::new(AUTO_PRIMARY_KEY_COLUMN, ColumnType::Integer)
            .primary_key()
            .auto_increment()
    }

    /// Marks the column as the table's primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Marks the column as `AUTOINCREMENT`.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the column as `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the raw SQL default expression. An empty string clears it.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.default_value = if value.is_empty() { None } else { Some(value) };
        self
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

/// Definition of a table.
///
/// When `auto_primary_key` is set and no column is named
/// [`AUTO_PRIMARY_KEY_COLUMN`], the table physically gets a leading
/// `_id INTEGER PRIMARY KEY AUTOINCREMENT` column. [`columns`](Self::columns)
/// always holds only what was declared; use
/// [`physical_columns`](Self::physical_columns) for what lands in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDef {
    pub name: String,
    #[serde(default)]
    pub auto_primary_key: bool,
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Creates a table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_primary_key: false,
            columns: Vec::new(),
        }
    }

    /// Requests the implicit `_id` primary key column.
    pub fn with_auto_primary_key(mut self) -> Self {
        self.auto_primary_key = true;
        self
    }

    /// Appends a column.
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Looks up a declared column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Declared column names, in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns `true` if an implicit `_id` column must be added.
    pub fn needs_implicit_key(&self) -> bool {
        self.auto_primary_key && self.column(AUTO_PRIMARY_KEY_COLUMN).is_none()
    }

    /// Columns as they exist in the store: the implicit key (if any) first,
    /// then the declared columns in order.
    pub fn physical_columns(&self) -> Vec<Cow<'_, ColumnDef>> {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        if self.needs_implicit_key() {
            columns.push(Cow::Owned(ColumnDef::auto_primary_key()));
        }
        columns.extend(self.columns.iter().map(Cow::Borrowed));
        columns
    }

    /// Names of [`physical_columns`](Self::physical_columns).
    pub fn physical_column_names(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(self.columns.len() + 1);
        if self.needs_implicit_key() {
            names.push(AUTO_PRIMARY_KEY_COLUMN);
        }
        names.extend(self.columns.iter().map(|c| c.name.as_str()));
        names
    }
}

/// A versioned declaration of a database's tables and columns.
///
/// Owned by the caller and treated as immutable while an upgrade runs.
/// Lookups by table name fail with [`SchemaError::TableNotFound`]; lookups by
/// index fail with an out-of-range error.
///
/// # Examples
///
/// ```
/// use tableschema_core::*;
///
/// let schema = SchemaDefinition::new("app", 2).with_table(
///     TableDef::new("notes")
///         .with_auto_primary_key()
///         .with_column(ColumnDef::new("body", ColumnType::Text).not_null()),
/// );
///
/// assert_eq!(schema.database_name(), "app");
/// assert_eq!(schema.table_names(), vec!["notes"]);
/// assert_eq!(schema.column_count("notes").unwrap(), 1);
/// assert_eq!(schema.column_type("notes", 0).unwrap(), ColumnType::Text);
/// assert!(schema.column_count("missing").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

impl SchemaDefinition {
    /// Creates a schema with no tables.
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            tables: Vec::new(),
        }
    }

    /// Appends a table.
    pub fn with_table(mut self, table: TableDef) -> Self {
        self.tables.push(table);
        self
    }

    pub fn database_name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Returns the table at `index`.
    pub fn table_at(&self, index: usize) -> Result<&TableDef> {
        self.tables
            .get(index)
            .ok_or(SchemaError::TableIndexOutOfRange {
                index,
                count: self.tables.len(),
            })
    }

    /// Returns the name of the table at `index`.
    pub fn table_name(&self, index: usize) -> Result<&str> {
        self.table_at(index).map(|t| t.name.as_str())
    }

    /// Returns the declared table called `name`.
    pub fn table(&self, name: &str) -> Result<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))
    }

    /// Returns `true` if the schema declares a table called `name`.
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    /// All declared table names, in declaration order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Number of declared columns in `table`.
    pub fn column_count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.columns.len())
    }

    /// Returns the declared column at `index` of `table`.
    pub fn column(&self, table: &str, index: usize) -> Result<&ColumnDef> {
        let def = self.table(table)?;
        def.columns
            .get(index)
            .ok_or_else(|| SchemaError::ColumnIndexOutOfRange {
                table: table.to_string(),
                index,
                count: def.columns.len(),
            })
    }

    pub fn column_name(&self, table: &str, index: usize) -> Result<&str> {
        self.column(table, index).map(|c| c.name.as_str())
    }

    pub fn column_type(&self, table: &str, index: usize) -> Result<ColumnType> {
        self.column(table, index).map(|c| c.column_type)
    }

    pub fn column_is_primary(&self, table: &str, index: usize) -> Result<bool> {
        self.column(table, index).map(|c| c.is_primary)
    }

    pub fn column_auto_increment(&self, table: &str, index: usize) -> Result<bool> {
        self.column(table, index).map(|c| c.auto_increment)
    }

    pub fn column_not_null(&self, table: &str, index: usize) -> Result<bool> {
        self.column(table, index).map(|c| c.not_null)
    }

    pub fn column_default_value(&self, table: &str, index: usize) -> Result<Option<&str>> {
        self.column(table, index).map(|c| c.default_value.as_deref())
    }

    /// Declared column names of `table`, in declaration order.
    pub fn column_names(&self, table: &str) -> Result<Vec<&str>> {
        Ok(self.table(table)?.column_names())
    }
}
