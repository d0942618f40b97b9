//! Carrying rows across a schema change with JSON import/export.
//!
//! Exports a table, rebuilds the database from a YAML schema whose table
//! drops and adds columns, and imports the exported rows back. Keys that
//! the new table no longer declares are skipped.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p tableschema-demos --example row_transfer
//! ```

use rusqlite::Connection;
use serde_json::json;
use tableschema_core::SchemaDefinition;
use tableschema_db::load_schema_file;
use tableschema_sqlite::{Migrator, TableRows, export_table, import_rows};

const PEOPLE_V2_YAML: &str = "\
name: people
version: 2
tables:
  - name: People
    autoPrimaryKey: true
    columns:
      - name: FirstName
        type: text
        notNull: true
      - name: Age
        type: integer
      - name: Score
        type: real
        defaultValue: '0.0'
";

fn main() {
    // === Step 1: Version 1 from JSON, filled through import ===
    let v1 = SchemaDefinition::from_json_str(
        &json!({
            "name": "people",
            "version": 1,
            "tables": [{
                "name": "People",
                "autoPrimaryKey": true,
                "columns": [
                    { "name": "FirstName", "type": "text", "notNull": true },
                    { "name": "Nickname", "type": "text" }
                ]
            }]
        })
        .to_string(),
    )
    .unwrap();

    let mut conn = Connection::open_in_memory().unwrap();
    Migrator::new(&v1).on_create(&mut conn).unwrap();

    let seed: TableRows = serde_json::from_value(json!({
        "name": "People",
        "rows": [
            { "FirstName": "John", "Nickname": "JJ" },
            { "FirstName": "Mary" }
        ]
    }))
    .unwrap();
    let inserted = import_rows(&mut conn, &v1, &seed).unwrap();
    println!("Imported {inserted} row(s) at version 1");

    let exported = export_table(&conn, "People").unwrap();
    println!("{}", serde_json::to_string_pretty(&exported).unwrap());

    // === Step 2: Version 2 from YAML, built into a fresh database ===
    let yaml_path = std::env::temp_dir().join("tableschema_row_transfer_v2.yaml");
    std::fs::write(&yaml_path, PEOPLE_V2_YAML).unwrap();
    let v2 = load_schema_file(&yaml_path).unwrap();
    std::fs::remove_file(&yaml_path).unwrap();

    let mut fresh = Connection::open_in_memory().unwrap();
    Migrator::new(&v2).on_create(&mut fresh).unwrap();

    // Nickname is skipped, Age stays NULL, Score takes its default
    let inserted = import_rows(&mut fresh, &v2, &exported).unwrap();
    println!("\nImported {inserted} row(s) at version 2");
    println!(
        "{}",
        serde_json::to_string_pretty(&export_table(&fresh, "People").unwrap()).unwrap()
    );
}
