//! Opening databases at a declared schema version.
//!
//! [`SchemaManager`] is the host side of the engine: it opens a connection,
//! compares the stored `user_version` with the schema's version, and decides
//! whether the database must be created, upgraded, or left alone.
//!
//! | Stored version | User tables | Action |
//! |----------------|-------------|--------|
//! | 0              | none        | [`Migrator::on_create`] |
//! | 0              | some        | [`Migrator::on_upgrade`] from 0 |
//! | below declared | any         | [`Migrator::on_upgrade`] |
//! | equal          | any         | nothing |
//! | above declared | any         | [`SqliteError::Downgrade`] |
//!
//! # Example
//!
//! ```no_run
//! use tableschema_db::SchemaCatalog;
//! use tableschema_sqlite::SchemaManager;
//!
//! let catalog = SchemaCatalog::from_dir("schemas/").unwrap();
//! let schema = catalog.latest("app").unwrap().clone();
//!
//! let manager = SchemaManager::open("app.db", schema).unwrap();
//! if let Some(report) = manager.report() {
//!     println!("{:?}: {} tables rebuilt", report.kind, report.migrated.len());
//! }
//!
//! let status = manager.status().unwrap();
//! println!("{} at version {}", status.database_name, status.stored_version);
//! ```

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use tableschema_core::{SchemaDefinition, SchemaError, validate_schema};
use tableschema_db::{StoreConfig, schema_fingerprint};
use tracing::{debug, warn};

use crate::error::{Result, SqliteError};
use crate::history::{self, HistoryEntry};
use crate::introspect::{Store, row_count};
use crate::migration::{MigrationReport, Migrator};
use crate::plan::MigrationPlan;

/// One live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStatus {
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
}

/// Snapshot of a managed database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseStatus {
    pub database_name: String,
    /// Version recorded in the database.
    pub stored_version: u32,
    /// Version of the schema it was inspected against.
    pub declared_version: u32,
    pub tables: Vec<TableStatus>,
    pub history: Vec<HistoryEntry>,
}

impl DatabaseStatus {
    /// Returns `true` if the database is at the declared version.
    pub fn is_current(&self) -> bool {
        self.stored_version == self.declared_version
    }
}

/// Reads the state of a database without changing it.
pub fn database_status(conn: &Connection, schema: &SchemaDefinition) -> Result<DatabaseStatus> {
    let mut tables = Vec::new();
    for name in conn.table_names()? {
        tables.push(TableStatus {
            columns: conn.column_names(&name)?,
            row_count: row_count(conn, &name)?,
            name,
        });
    }

    Ok(DatabaseStatus {
        database_name: schema.name.clone(),
        stored_version: history::stored_version(conn)?,
        declared_version: schema.version(),
        tables,
        history: history::history_entries(conn)?,
    })
}

/// A connection reconciled with a schema definition.
pub struct SchemaManager {
    conn: Connection,
    schema: SchemaDefinition,
    report: Option<MigrationReport>,
}

impl SchemaManager {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, schema: SchemaDefinition) -> Result<Self> {
        Self::open_with_config(&StoreConfig::file(path.as_ref()), schema)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(schema: SchemaDefinition) -> Result<Self> {
        Self::open_with_config(&StoreConfig::in_memory(), schema)
    }

    /// Opens the store `config` describes and applies its pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::LoaderError`] if the config names no store.
    pub fn open_with_config(config: &StoreConfig, schema: SchemaDefinition) -> Result<Self> {
        config.validate()?;
        let conn = match config.path.as_deref() {
            Some(path) if !config.in_memory => Connection::open(path)?,
            _ => Connection::open_in_memory()?,
        };
        apply_pragmas(&conn, config)?;
        Self::with_connection(conn, schema)
    }

    /// Takes ownership of an open connection and brings it to the schema's
    /// version.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::SchemaError`] if the schema fails validation,
    /// [`SqliteError::Downgrade`] if the database is newer than the schema,
    /// or the error of the failed create or upgrade. The database is
    /// unchanged in every case.
    pub fn with_connection(mut conn: Connection, schema: SchemaDefinition) -> Result<Self> {
        let errors = validate_schema(&schema);
        if !errors.is_empty() {
            return Err(SchemaError::Invalid(errors).into());
        }
        let report = reconcile(&mut conn, &schema)?;
        Ok(Self {
            conn,
            schema,
            report,
        })
    }

    /// What opening the database did; `None` if it was already current.
    pub fn report(&self) -> Option<&MigrationReport> {
        self.report.as_ref()
    }

    pub fn status(&self) -> Result<DatabaseStatus> {
        database_status(&self.conn, &self.schema)
    }

    /// Plans against the live database without changing it.
    ///
    /// Right after opening this lists every declared table under
    /// `to_migrate`, since all of them exist.
    pub fn plan(&self) -> Result<MigrationPlan> {
        Migrator::new(&self.schema).plan(&self.conn)
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns a mutable reference to the underlying connection.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Consumes the manager and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> Result<()> {
    let mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        config.journal_mode.pragma_value(),
        |row| row.get(0),
    )?;
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    debug!(journal_mode = %mode, foreign_keys = config.foreign_keys, "connection configured");
    Ok(())
}

fn reconcile(conn: &mut Connection, schema: &SchemaDefinition) -> Result<Option<MigrationReport>> {
    let stored = history::stored_version(conn)?;
    let declared = schema.version();
    let migrator = Migrator::new(schema);

    if stored > declared {
        return Err(SqliteError::Downgrade {
            database: schema.name.clone(),
            current: stored,
            requested: declared,
        });
    }
    if stored == declared {
        check_drift(conn, schema)?;
        return Ok(None);
    }

    let report = if history::is_fresh(conn)? {
        migrator.on_create(conn)?
    } else {
        migrator.on_upgrade(conn, stored, declared)?
    };
    Ok(Some(report))
}

/// Warns when a database at the declared version was built from different
/// schema content.
fn check_drift(conn: &Connection, schema: &SchemaDefinition) -> Result<()> {
    let Some(recorded) = history::latest_fingerprint(conn, &schema.name)? else {
        return Ok(());
    };
    let current = schema_fingerprint(schema)?;
    if recorded != current {
        warn!(
            schema = %schema.name,
            version = schema.version(),
            "schema content changed without a version bump"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableschema_core::{ColumnDef, ColumnType, TableDef};
    use tableschema_db::JournalMode;

    fn schema(version: u32, columns: &[&str]) -> SchemaDefinition {
        let mut table = TableDef::new("TestTable").with_auto_primary_key();
        for column in columns {
            table = table.with_column(ColumnDef::new(*column, ColumnType::Text));
        }
        SchemaDefinition::new("app", version).with_table(table)
    }

    #[test]
    fn test_fresh_open_creates() {
        let manager = SchemaManager::open_in_memory(schema(1, &["a"])).unwrap();
        let report = manager.report().unwrap();
        assert_eq!(report.kind, crate::MigrationKind::Create);

        let status = manager.status().unwrap();
        assert!(status.is_current());
        assert_eq!(status.tables.len(), 1);
        assert_eq!(status.tables[0].columns, vec!["_id", "a"]);
        assert_eq!(status.history.len(), 1);
    }

    #[test]
    fn test_reopen_same_version_is_noop() {
        let manager = SchemaManager::open_in_memory(schema(1, &["a"])).unwrap();
        let conn = manager.into_connection();
        let manager = SchemaManager::with_connection(conn, schema(1, &["a"])).unwrap();
        assert!(manager.report().is_none());
        assert_eq!(manager.status().unwrap().history.len(), 1);
    }

    #[test]
    fn test_upgrade_on_version_bump() {
        let manager = SchemaManager::open_in_memory(schema(1, &["a", "b"])).unwrap();
        let conn = manager.into_connection();
        let manager = SchemaManager::with_connection(conn, schema(2, &["a", "c"])).unwrap();

        let report = manager.report().unwrap();
        assert_eq!((report.from_version, report.to_version), (1, 2));
        assert_eq!(report.migrated[0].preserved_columns, vec!["_id", "a"]);
        assert_eq!(manager.status().unwrap().stored_version, 2);
    }

    #[test]
    fn test_adopts_unversioned_database() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE TestTable (_id INTEGER PRIMARY KEY, a TEXT, legacy TEXT);
             INSERT INTO TestTable (a, legacy) VALUES ('kept', 'lost');",
        )
        .unwrap();

        let manager = SchemaManager::with_connection(conn, schema(1, &["a"])).unwrap();
        let report = manager.report().unwrap();
        assert_eq!(report.kind, crate::MigrationKind::Upgrade);
        assert_eq!(report.from_version, 0);

        let a: String = manager
            .connection()
            .query_row("SELECT a FROM TestTable", [], |row| row.get(0))
            .unwrap();
        assert_eq!(a, "kept");
        assert!(!manager.connection().has_column("TestTable", "legacy").unwrap());
    }

    #[test]
    fn test_downgrade_is_rejected() {
        let manager = SchemaManager::open_in_memory(schema(3, &["a"])).unwrap();
        let conn = manager.into_connection();
        let err = SchemaManager::with_connection(conn, schema(2, &["a"]))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SqliteError::Downgrade { current: 3, requested: 2, .. }
        ));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let err = SchemaManager::open_in_memory(SchemaDefinition::new("app", 0))
            .err()
            .unwrap();
        assert!(matches!(err, SqliteError::SchemaError(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_open_with_config() {
        let mut config = StoreConfig::in_memory();
        config.journal_mode = JournalMode::Memory;
        config.foreign_keys = true;
        let manager = SchemaManager::open_with_config(&config, schema(1, &["a"])).unwrap();
        let fk: i64 = manager
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);

        let err = SchemaManager::open_with_config(&StoreConfig::default(), schema(1, &["a"]))
            .err()
            .unwrap();
        assert!(matches!(err, SqliteError::LoaderError(_)));
    }

    #[test]
    fn test_plan_after_open_lists_tables_to_migrate() {
        let manager = SchemaManager::open_in_memory(schema(1, &["a"])).unwrap();
        let plan = manager.plan().unwrap();
        assert_eq!(plan.to_migrate, vec!["TestTable"]);
        assert!(plan.to_create.is_empty());
        assert!(plan.to_drop.is_empty());
    }
}
