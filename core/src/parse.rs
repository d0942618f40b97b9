//! Strict parsing of schema source documents.
//!
//! The source format is a JSON document:
//!
//! ```json
//! {
//!   "name": "employees",
//!   "version": 1,
//!   "tables": [
//!     {
//!       "name": "Employees",
//!       "autoPrimaryKey": true,
//!       "columns": [
//!         { "name": "first_name", "type": "text", "notNull": true },
//!         { "name": "salary", "type": "real", "defaultValue": "0" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Malformed documents fail with [`SchemaError::ParseError`], unknown column
//! types with [`SchemaError::UnsupportedColumnType`], and structurally
//! invalid schemas with [`SchemaError::Invalid`]. Nothing degrades to an
//! empty schema.

use serde_json::Value;

use crate::error::{Result, SchemaError};
use crate::types::{ColumnType, SchemaDefinition};
use crate::validate::validate_schema;

impl SchemaDefinition {
    /// Parses and validates a schema from JSON text.
    ///
    /// # Examples
    ///
    /// ```
    /// use tableschema_core::{SchemaDefinition, SchemaError};
    ///
    /// let schema = SchemaDefinition::from_json_str(r#"{
    ///     "name": "app",
    ///     "version": 1,
    ///     "tables": [{ "name": "t", "columns": [{ "name": "a", "type": "int" }] }]
    /// }"#).unwrap();
    /// assert_eq!(schema.table_names(), vec!["t"]);
    ///
    /// let err = SchemaDefinition::from_json_str(r#"{
    ///     "name": "app",
    ///     "version": 1,
    ///     "tables": [{ "name": "t", "columns": [{ "name": "a", "type": "varchar" }] }]
    /// }"#).unwrap_err();
    /// assert!(matches!(err, SchemaError::UnsupportedColumnType { .. }));
    /// ```
    pub fn from_json_str(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_json_value(value)
    }

    /// Parses and validates a schema from JSON bytes.
    pub fn from_json_slice(source: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(source)?;
        Self::from_json_value(value)
    }

    /// Parses and validates a schema from an already-decoded document.
    ///
    /// Other front ends (YAML loaders, for one) decode into a [`Value`] and
    /// come through here so they share the same checks.
    pub fn from_json_value(value: Value) -> Result<Self> {
        check_column_types(&value)?;
        let schema: SchemaDefinition = serde_json::from_value(value)?;
        let errors = validate_schema(&schema);
        if !errors.is_empty() {
            return Err(SchemaError::Invalid(errors));
        }
        Ok(schema)
    }

    /// Serializes the schema back to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Reports the first column whose `type` is a string no alias matches.
///
/// Runs before typed deserialization so the error names the offending
/// table and column. Shape errors are left for serde to report.
fn check_column_types(document: &Value) -> Result<()> {
    let Some(tables) = document.get("tables").and_then(Value::as_array) else {
        return Ok(());
    };

    for table in tables {
        let table_name = table.get("name").and_then(Value::as_str).unwrap_or_default();
        let Some(columns) = table.get("columns").and_then(Value::as_array) else {
            continue;
        };
        for column in columns {
            let Some(declared) = column.get("type").and_then(Value::as_str) else {
                continue;
            };
            if declared.parse::<ColumnType>().is_err() {
                return Err(SchemaError::UnsupportedColumnType {
                    table: table_name.to_string(),
                    column: column
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    declared: declared.to_string(),
                });
            }
        }
    }

    Ok(())
}
