//! Core schema types for declarative SQLite databases.
//!
//! This crate defines the schema-as-data model that the migration engine
//! reconciles live databases against:
//!
//! - [`SchemaDefinition`]: a database name, a version, and its tables.
//! - [`TableDef`]: a table with its columns and an optional implicit
//!   `_id` primary key.
//! - [`ColumnDef`]: a column with a [`ColumnType`] and constraints.
//!
//! Parsing ([`SchemaDefinition::from_json_str`]) is strict and always runs
//! [`validate_schema`], so a successfully parsed schema can be turned into
//! DDL without further checks.
//!
//! # Example
//!
//! ```
//! use tableschema_core::*;
//!
//! let schema = SchemaDefinition::new("notes_app", 1).with_table(
//!     TableDef::new("notes")
//!         .with_auto_primary_key()
//!         .with_column(ColumnDef::new("title", ColumnType::Text).not_null())
//!         .with_column(ColumnDef::new("rating", ColumnType::Real).with_default("0")),
//! );
//!
//! assert!(validate_schema(&schema).is_empty());
//! assert_eq!(
//!     schema.table("notes").unwrap().physical_column_names(),
//!     vec!["_id", "title", "rating"]
//! );
//! ```

mod error;
mod parse;
mod types;
mod validate;

pub use error::{Result, SchemaError};
pub use types::*;
pub use validate::{ValidationError, is_plain_identifier, is_sql_keyword, validate_schema};
