//! Content fingerprints for schema revisions.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of the schema's compact
//! JSON serialization. Field order is fixed by the type definitions, so two
//! schemas with identical content always hash the same, regardless of how
//! their source documents were formatted.

use sha2::{Digest, Sha256};
use tableschema_core::SchemaDefinition;

use crate::error::Result;

/// Computes the fingerprint of a schema definition.
///
/// # Examples
///
/// ```
/// use tableschema_core::*;
/// use tableschema_db::schema_fingerprint;
///
/// let a = SchemaDefinition::new("app", 1)
///     .with_table(TableDef::new("t").with_column(ColumnDef::new("x", ColumnType::Text)));
/// let b = a.clone();
/// let c = SchemaDefinition::new("app", 2)
///     .with_table(TableDef::new("t").with_column(ColumnDef::new("x", ColumnType::Text)));
///
/// let fa = schema_fingerprint(&a).unwrap();
/// assert_eq!(fa.len(), 64);
/// assert_eq!(fa, schema_fingerprint(&b).unwrap());
/// assert_ne!(fa, schema_fingerprint(&c).unwrap());
/// ```
pub fn schema_fingerprint(schema: &SchemaDefinition) -> Result<String> {
    let bytes = serde_json::to_vec(schema)?;
    let hash = Sha256::digest(&bytes);
    Ok(format!("{:x}", hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableschema_core::{ColumnDef, ColumnType, TableDef};

    fn schema(version: u32) -> SchemaDefinition {
        SchemaDefinition::new("app", version).with_table(
            TableDef::new("notes")
                .with_auto_primary_key()
                .with_column(ColumnDef::new("body", ColumnType::Text)),
        )
    }

    #[test]
    fn test_fingerprint_is_stable_across_formatting() {
        let compact = r#"{"name":"app","version":1,"tables":[{"name":"notes","autoPrimaryKey":true,"columns":[{"name":"body","type":"text"}]}]}"#;
        let spaced = r#"{
            "version": 1,
            "name": "app",
            "tables": [
                { "columns": [ { "type": "TEXT", "name": "body" } ], "name": "notes", "autoPrimaryKey": true }
            ]
        }"#;
        let a = SchemaDefinition::from_json_str(compact).unwrap();
        let b = SchemaDefinition::from_json_str(spaced).unwrap();
        assert_eq!(
            schema_fingerprint(&a).unwrap(),
            schema_fingerprint(&b).unwrap()
        );
        assert_eq!(
            schema_fingerprint(&a).unwrap(),
            schema_fingerprint(&schema(1)).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let base = schema_fingerprint(&schema(1)).unwrap();
        assert_ne!(base, schema_fingerprint(&schema(2)).unwrap());

        let mut altered = schema(1);
        altered.tables[0].columns[0].not_null = true;
        assert_ne!(base, schema_fingerprint(&altered).unwrap());
    }
}
