//! Moving table rows to and from JSON.
//!
//! The JSON shape is one object per table:
//!
//! ```json
//! { "name": "People", "rows": [ { "FirstName": "John", "Age": 31 } ] }
//! ```
//!
//! Exports are keyed by live column names. Imports are checked against the
//! declared table: keys that are not physical columns are skipped, and
//! missing keys fall back to the column defaults.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tableschema_core::SchemaDefinition;
use tracing::debug;

use crate::ddl::quote_ident;
use crate::error::{Result, SqliteError};
use crate::introspect::Store;
use crate::migration::finish;

/// The rows of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRows {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
}

/// Reads every row of `table` in row order.
///
/// # Errors
///
/// Returns [`SqliteError::TableNotFound`] for an unknown table and
/// [`SqliteError::ConversionError`] for BLOB values or text that is not
/// valid UTF-8.
pub fn export_table(conn: &Connection, table: &str) -> Result<TableRows> {
    let columns = conn.column_names(table)?;
    let list = columns
        .iter()
        .map(|c| quote_ident(c).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT {list} FROM {} ORDER BY rowid",
        quote_ident(table)
    ))?;

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut object = Map::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let value = sql_to_json(row.get_ref(index)?, table, column)?;
            object.insert(column.clone(), value);
        }
        rows.push(object);
    }

    debug!(table, rows = rows.len(), "exported rows");
    Ok(TableRows {
        name: table.to_string(),
        rows,
    })
}

/// Inserts rows into a declared table in one transaction.
///
/// Returns the number of rows inserted. Any failure rolls the whole import
/// back.
///
/// # Errors
///
/// Returns [`SqliteError::SchemaError`] if the schema does not declare the
/// table and [`SqliteError::ConversionError`] for array or object values.
pub fn import_rows(
    conn: &mut Connection,
    schema: &SchemaDefinition,
    data: &TableRows,
) -> Result<usize> {
    let table = schema.table(&data.name)?;
    let columns = table.physical_column_names();

    let tx = conn.transaction()?;
    let result = (|| -> Result<usize> {
        for row in &data.rows {
            let present: Vec<&str> = columns
                .iter()
                .copied()
                .filter(|c| row.contains_key(*c))
                .collect();
            if present.len() < row.len() {
                debug!(table = %data.name, "skipping keys that are not declared columns");
            }

            let values = present
                .iter()
                .map(|c| json_to_sql(&row[*c], &data.name, c))
                .collect::<Result<Vec<_>>>()?;
            tx.execute(&insert_sql(&data.name, &present), params_from_iter(values))?;
        }
        Ok(data.rows.len())
    })();
    let inserted = finish(tx, result)?;

    debug!(table = %data.name, rows = inserted, "imported rows");
    Ok(inserted)
}

fn insert_sql(table: &str, columns: &[&str]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    let list = columns
        .iter()
        .map(|c| quote_ident(c).into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({list}) VALUES ({placeholders})",
        quote_ident(table)
    )
}

fn sql_to_json(value: ValueRef<'_>, table: &str, column: &str) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::from(i)),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| {
                SqliteError::ConversionError(format!("non-finite real in {table}.{column}"))
            }),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| SqliteError::ConversionError(format!("{table}.{column}: {e}"))),
        ValueRef::Blob(_) => Err(SqliteError::ConversionError(format!(
            "{table}.{column} holds a BLOB, which has no JSON form"
        ))),
    }
}

fn json_to_sql(value: &Value, table: &str, column: &str) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real).ok_or_else(|| {
                SqliteError::ConversionError(format!("{table}.{column}: unsupported number {n}"))
            }),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(SqliteError::ConversionError(format!(
            "{table}.{column}: nested values cannot be stored"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::Migrator;
    use serde_json::json;
    use tableschema_core::{ColumnDef, ColumnType, TableDef};

    fn people() -> SchemaDefinition {
        SchemaDefinition::new("people", 1).with_table(
            TableDef::new("People")
                .with_auto_primary_key()
                .with_column(ColumnDef::new("FirstName", ColumnType::Text))
                .with_column(ColumnDef::new("Age", ColumnType::Integer))
                .with_column(ColumnDef::new("Score", ColumnType::Real).with_default("1.5")),
        )
    }

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        Migrator::new(&people()).on_create(&mut conn).unwrap();
        conn
    }

    fn rows(value: Value) -> TableRows {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_import_then_export() {
        let mut conn = setup();
        let data = rows(json!({
            "name": "People",
            "rows": [
                { "FirstName": "John", "Age": 31, "Nickname": "ignored" },
                { "FirstName": "Ada", "Score": 9.25 },
                {}
            ]
        }));
        assert_eq!(import_rows(&mut conn, &people(), &data).unwrap(), 3);

        let exported = export_table(&conn, "People").unwrap();
        assert_eq!(exported.name, "People");
        assert_eq!(
            serde_json::to_value(&exported.rows).unwrap(),
            json!([
                { "_id": 1, "FirstName": "John", "Age": 31, "Score": 1.5 },
                { "_id": 2, "FirstName": "Ada", "Age": null, "Score": 9.25 },
                { "_id": 3, "FirstName": null, "Age": null, "Score": 1.5 }
            ])
        );
    }

    #[test]
    fn test_import_bool_becomes_integer() {
        let mut conn = setup();
        let data = rows(json!({ "name": "People", "rows": [ { "Age": true } ] }));
        import_rows(&mut conn, &people(), &data).unwrap();
        let age: i64 = conn
            .query_row("SELECT Age FROM People", [], |row| row.get(0))
            .unwrap();
        assert_eq!(age, 1);
    }

    #[test]
    fn test_import_is_atomic() {
        let mut conn = setup();
        let data = rows(json!({
            "name": "People",
            "rows": [
                { "FirstName": "ok" },
                { "FirstName": ["nested"] }
            ]
        }));
        let err = import_rows(&mut conn, &people(), &data).unwrap_err();
        assert!(matches!(err, SqliteError::ConversionError(_)));
        assert_eq!(crate::introspect::row_count(&conn, "People").unwrap(), 0);
    }

    #[test]
    fn test_import_unknown_table() {
        let mut conn = setup();
        let data = rows(json!({ "name": "Ghosts", "rows": [] }));
        assert!(matches!(
            import_rows(&mut conn, &people(), &data),
            Err(SqliteError::SchemaError(_))
        ));
    }

    #[test]
    fn test_export_rejects_blob() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE files (data BLOB); INSERT INTO files VALUES (x'00ff');")
            .unwrap();
        assert!(matches!(
            export_table(&conn, "files"),
            Err(SqliteError::ConversionError(_))
        ));
        assert!(matches!(
            export_table(&conn, "missing"),
            Err(SqliteError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(insert_sql("t", &[]), "INSERT INTO t DEFAULT VALUES");
        assert_eq!(
            insert_sql("t", &["a", "b"]),
            "INSERT INTO t (a, b) VALUES (?1, ?2)"
        );
    }
}
