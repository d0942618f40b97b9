use std::path::{Path, PathBuf};

use tableschema_core::{ColumnDef, ColumnType, SchemaDefinition, TableDef};
use tableschema_db::{
    CatalogSource, DatabaseError, JournalMode, SchemaCatalog, StoreConfig, ToolConfig,
    schema_fingerprint,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn revision(version: u32, columns: &[&str]) -> SchemaDefinition {
    let mut table = TableDef::new("TestTable").with_auto_primary_key();
    for column in columns {
        table = table.with_column(ColumnDef::new(*column, ColumnType::Text));
    }
    SchemaDefinition::new("migration_table", version).with_table(table)
}

fn fresh_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_json(dir: &Path, file: &str, schema: &SchemaDefinition) {
    std::fs::write(dir.join(file), schema.to_json_pretty().unwrap()).unwrap();
}

// ---------------------------------------------------------------------------
// Catalog loading
// ---------------------------------------------------------------------------

#[test]
fn test_mixed_format_directory() {
    let dir = fresh_dir("ts_db_integ_mixed");

    write_json(&dir, "v1.json", &revision(1, &["column1", "column2"]));
    write_json(&dir, "v2.json", &revision(2, &["column1", "column2", "column3"]));
    std::fs::write(
        dir.join("v4.yml"),
        r#"
name: migration_table
version: 4
tables:
  - name: TestTable
    autoPrimaryKey: true
    columns:
      - { name: column3, type: text }
      - { name: column4, type: text }
  - name: NewTable1
    autoPrimaryKey: true
    columns:
      - { name: column1, type: text }
"#,
    )
    .unwrap();

    let catalog = SchemaCatalog::from_dir(&dir).unwrap();
    assert_eq!(catalog.revisions("migration_table"), vec![1, 2, 4]);

    let latest = catalog.latest("migration_table").unwrap();
    assert_eq!(latest.version(), 4);
    assert_eq!(latest.table_names(), vec!["TestTable", "NewTable1"]);
    assert_eq!(
        catalog.get("migration_table", 2).unwrap().column_names("TestTable").unwrap(),
        vec!["column1", "column2", "column3"]
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_conflicting_files_are_rejected() {
    let dir = fresh_dir("ts_db_integ_conflict");

    write_json(&dir, "a.json", &revision(1, &["column1"]));
    write_json(&dir, "b.json", &revision(1, &["column2"]));

    let err = SchemaCatalog::from_dir(&dir).unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::DuplicateRevision { version: 1, .. }
    ));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_malformed_file_fails_directory_load() {
    let dir = fresh_dir("ts_db_integ_malformed");

    write_json(&dir, "good.json", &revision(1, &["column1"]));
    std::fs::write(dir.join("broken.json"), "{ \"name\": ").unwrap();

    let err = SchemaCatalog::from_dir(&dir).unwrap_err();
    assert!(matches!(err, DatabaseError::SchemaError(_)));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_builder_skips_failing_sources() {
    let dir = fresh_dir("ts_db_integ_builder");
    write_json(&dir, "v1.json", &revision(1, &["column1"]));

    let catalog = SchemaCatalog::builder()
        .from_file(dir.join("missing.json"))
        .from_dir(&dir)
        .build()
        .unwrap();
    assert_eq!(catalog.resolve(None).unwrap().version(), 1);
    match catalog.source() {
        CatalogSource::Multiple(sources) => {
            assert_eq!(sources[1], CatalogSource::Directory(dir.clone()));
        }
        other => panic!("unexpected source: {other:?}"),
    }

    std::fs::remove_dir_all(&dir).ok();
}

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

#[test]
fn test_fingerprint_survives_file_round_trip() {
    let dir = fresh_dir("ts_db_integ_fingerprint");
    let schema = revision(3, &["column1", "column2"]);
    write_json(&dir, "v3.json", &schema);

    let catalog = SchemaCatalog::from_file(dir.join("v3.json")).unwrap();
    let loaded = catalog.get("migration_table", 3).unwrap();
    assert_eq!(
        schema_fingerprint(loaded).unwrap(),
        schema_fingerprint(&schema).unwrap()
    );
    assert_ne!(
        schema_fingerprint(loaded).unwrap(),
        schema_fingerprint(&revision(3, &["column1"])).unwrap()
    );

    std::fs::remove_dir_all(&dir).ok();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_points_at_catalog() {
    let dir = fresh_dir("ts_db_integ_config");
    let schemas = dir.join("schemas");
    std::fs::create_dir_all(&schemas).unwrap();
    write_json(&schemas, "v1.json", &revision(1, &["column1"]));

    let config_path = dir.join("tableschema.yml");
    let mut config = ToolConfig {
        store: StoreConfig::file(dir.join("app.db")),
        ..Default::default()
    };
    config.store.journal_mode = JournalMode::Wal;
    config.schema.dir = Some(schemas.clone());
    config.schema.name = Some("migration_table".into());
    config.save(&config_path).unwrap();

    let loaded = ToolConfig::load(&config_path).unwrap();
    loaded.validate().unwrap();
    assert_eq!(loaded, config);

    let catalog = SchemaCatalog::from_dir(loaded.schema.dir.as_ref().unwrap()).unwrap();
    let schema = catalog.resolve(loaded.schema.name.as_deref()).unwrap();
    assert_eq!(schema.database_name(), "migration_table");

    std::fs::remove_dir_all(&dir).ok();
}
