//! Versioned upgrade walkthrough.
//!
//! Opens an on-disk database at revision 1 of a schema, writes some rows,
//! then reopens it at revision 2 and 3 and shows what each upgrade kept.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=tableschema_sqlite=debug cargo run -p tableschema-demos --example upgrade_walkthrough
//! ```

use std::path::Path;

use serde_json::json;
use tableschema_core::SchemaDefinition;
use tableschema_db::SchemaCatalog;
use tableschema_sqlite::{SchemaManager, Store, column_values, ddl};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // === Step 1: Write three schema revisions into a directory ===
    let workdir = std::env::temp_dir().join("tableschema_upgrade_walkthrough");
    let _ = std::fs::remove_dir_all(&workdir);
    std::fs::create_dir_all(&workdir).unwrap();

    write_revision(&workdir, 1, json!([
        { "name": "contacts", "autoPrimaryKey": true, "columns": [
            { "name": "first_name", "type": "text" },
            { "name": "last_name", "type": "text" },
            { "name": "fax", "type": "text" }
        ]}
    ]));
    write_revision(&workdir, 2, json!([
        { "name": "contacts", "autoPrimaryKey": true, "columns": [
            { "name": "first_name", "type": "text" },
            { "name": "last_name", "type": "text" },
            { "name": "email", "type": "text" }
        ]},
        { "name": "groups", "autoPrimaryKey": true, "columns": [
            { "name": "label", "type": "text", "notNull": true }
        ]}
    ]));
    write_revision(&workdir, 3, json!([
        { "name": "contacts", "autoPrimaryKey": true, "columns": [
            { "name": "first_name", "type": "text" },
            { "name": "last_name", "type": "text" },
            { "name": "email", "type": "text" },
            { "name": "favorite", "type": "int", "notNull": true, "defaultValue": "0" }
        ]}
    ]));

    let catalog = SchemaCatalog::from_dir(&workdir).unwrap();
    println!(
        "Loaded revisions {:?} of 'contacts'",
        catalog.revisions("contacts")
    );

    // === Step 2: Create the database at revision 1 ===
    let db_path = workdir.join("contacts.db");
    let v1 = catalog.get("contacts", 1).unwrap().clone();
    println!("\n=== Revision 1 ===");
    print!("{}", ddl::create_schema_sql(&v1));

    let manager = SchemaManager::open(&db_path, v1).unwrap();
    for (first, last) in [("Ada", "Lovelace"), ("Alan", "Turing"), ("Grace", "Hopper")] {
        manager
            .connection()
            .execute(
                "INSERT INTO contacts (first_name, last_name, fax) VALUES (?1, ?2, 'n/a')",
                [first, last],
            )
            .unwrap();
    }
    drop(manager);

    // === Step 3: Step through the later revisions ===
    for version in 2..=3 {
        let schema = catalog.get("contacts", version).unwrap().clone();
        println!("\n=== Revision {version} ===");
        reopen(&db_path, schema);
    }

    // === Step 4: Inspect the result ===
    let manager = SchemaManager::open(&db_path, catalog.latest("contacts").unwrap().clone()).unwrap();
    let conn = manager.connection();
    println!("\nFinal tables: {:?}", conn.table_names().unwrap());
    println!(
        "contacts columns: {:?}",
        conn.column_names("contacts").unwrap()
    );
    println!(
        "last names kept: {:?}",
        column_values(conn, "contacts", "last_name").unwrap()
    );

    let status = manager.status().unwrap();
    println!("\nHistory:");
    for entry in &status.history {
        println!(
            "  {} -> {} (created {}, dropped {}, migrated {})",
            entry.from_version,
            entry.to_version,
            entry.tables_created,
            entry.tables_dropped,
            entry.tables_migrated
        );
    }

    std::fs::remove_dir_all(&workdir).unwrap();
    println!("\nDone.");
}

fn reopen(path: &Path, schema: SchemaDefinition) {
    let manager = SchemaManager::open(path, schema).unwrap();
    let Some(report) = manager.report() else {
        println!("Already current.");
        return;
    };
    println!(
        "Upgraded {} -> {}: created {:?}, dropped {:?}",
        report.from_version, report.to_version, report.created, report.dropped
    );
    for migration in &report.migrated {
        println!(
            "  rebuilt {}: kept {:?}, {} row(s) copied",
            migration.table, migration.preserved_columns, migration.rows_copied
        );
    }
}

fn write_revision(dir: &Path, version: u32, tables: serde_json::Value) {
    let schema = json!({ "name": "contacts", "version": version, "tables": tables });
    let path = dir.join(format!("contacts_v{version}.json"));
    std::fs::write(path, serde_json::to_string_pretty(&schema).unwrap()).unwrap();
}
