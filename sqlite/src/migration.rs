//! The migration engine.
//!
//! [`Migrator`] reconciles a live database with a [`SchemaDefinition`]. A
//! fresh database gets every declared table created; an existing one is
//! planned with [`plan`](crate::plan()) and then, inside one transaction:
//!
//! 1. obsolete tables are dropped,
//! 2. missing tables are created,
//! 3. every table present on both sides is rebuilt: renamed to
//!    `<name>_old`, recreated from its definition, the columns both versions
//!    share are copied across, and the old copy is dropped.
//!
//! The history row and the `user_version` bump are written in the same
//! transaction. Any failure rolls everything back and is returned to the
//! caller tagged with the table and operation that failed.
//!
//! # Example
//!
//! ```
//! use rusqlite::Connection;
//! use tableschema_core::SchemaDefinition;
//! use tableschema_sqlite::{MigrationKind, Migrator, Store};
//!
//! let v1 = SchemaDefinition::from_json_str(r#"{"name":"app","version":1,"tables":[
//!     {"name":"notes","autoPrimaryKey":true,"columns":[{"name":"body","type":"text"}]}]}"#).unwrap();
//! let v2 = SchemaDefinition::from_json_str(r#"{"name":"app","version":2,"tables":[
//!     {"name":"notes","autoPrimaryKey":true,"columns":[
//!         {"name":"body","type":"text"},{"name":"pinned","type":"int","defaultValue":"0"}]}]}"#).unwrap();
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! Migrator::new(&v1).on_create(&mut conn).unwrap();
//! conn.execute("INSERT INTO notes (body) VALUES ('hello')", []).unwrap();
//!
//! let report = Migrator::new(&v2).on_upgrade(&mut conn, 1, 2).unwrap();
//! assert_eq!(report.kind, MigrationKind::Upgrade);
//! assert_eq!(report.migrated[0].preserved_columns, vec!["_id", "body"]);
//! assert!(conn.has_column("notes", "pinned").unwrap());
//! ```

use std::collections::HashSet;

use rusqlite::{Connection, Transaction};
use serde::Serialize;
use tableschema_core::{SchemaDefinition, TableDef};
use tracing::{debug, info, warn};

use crate::ddl::{
    copy_columns_sql, create_table_sql, drop_table_sql, rename_table_sql, temp_table_name,
};
use crate::error::{Operation, Result, SqliteError};
use crate::history;
use crate::introspect::Store;
use crate::plan::{MigrationPlan, plan};

/// Whether a run created a database from scratch or upgraded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    Create,
    Upgrade,
}

/// What a rebuild of one table carried over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMigration {
    pub table: String,
    /// Columns present in both versions, in the old table's order.
    pub preserved_columns: Vec<String>,
    pub rows_copied: usize,
}

/// Outcome of a create or upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub kind: MigrationKind,
    pub from_version: u32,
    pub to_version: u32,
    pub created: Vec<String>,
    pub dropped: Vec<String>,
    pub migrated: Vec<TableMigration>,
}

impl MigrationReport {
    /// An empty report.
    pub fn new(kind: MigrationKind, from_version: u32, to_version: u32) -> Self {
        Self {
            kind,
            from_version,
            to_version,
            created: Vec::new(),
            dropped: Vec::new(),
            migrated: Vec::new(),
        }
    }

    /// Total rows carried over by all rebuilt tables.
    pub fn rows_copied(&self) -> usize {
        self.migrated.iter().map(|m| m.rows_copied).sum()
    }
}

/// Applies one schema definition to a database.
///
/// Holds no connection; each call borrows the one it works on.
#[derive(Debug, Clone, Copy)]
pub struct Migrator<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> Migrator<'a> {
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a SchemaDefinition {
        self.schema
    }

    /// Creates every declared table in a fresh database.
    ///
    /// Runs in one transaction that also records the history row and sets
    /// `user_version` to the schema's version.
    pub fn on_create(&self, conn: &mut Connection) -> Result<MigrationReport> {
        let version = self.schema.version();
        let tx = conn.transaction()?;
        let result = self.create_all(&*tx).and_then(|report| {
            self.record(&tx, &report)?;
            Ok(report)
        });
        let report = finish(tx, result)?;
        info!(
            schema = %self.schema.name,
            version,
            tables = report.created.len(),
            "database created"
        );
        Ok(report)
    }

    /// Upgrades an existing database from `old_version` to `new_version`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Downgrade`] if `new_version` is lower than
    /// `old_version`, and [`SqliteError::StepFailed`] if any statement fails.
    /// On error nothing is changed.
    pub fn on_upgrade(
        &self,
        conn: &mut Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<MigrationReport> {
        if new_version < old_version {
            return Err(SqliteError::Downgrade {
                database: self.schema.name.clone(),
                current: old_version,
                requested: new_version,
            });
        }

        let tx = conn.transaction()?;
        let result = self.apply(&*tx).and_then(|mut report| {
            report.from_version = old_version;
            report.to_version = new_version;
            self.record(&tx, &report)?;
            Ok(report)
        });
        let report = finish(tx, result)?;
        info!(
            schema = %self.schema.name,
            from = old_version,
            to = new_version,
            created = report.created.len(),
            dropped = report.dropped.len(),
            migrated = report.migrated.len(),
            "upgrade committed"
        );
        Ok(report)
    }

    /// Classifies live tables against the declared ones without changing
    /// anything.
    pub fn plan<S: Store + ?Sized>(&self, store: &S) -> Result<MigrationPlan> {
        let live = store.table_names()?;
        let plan = plan(&live, &self.schema.table_names());
        debug!(
            migrate = ?plan.to_migrate,
            drop = ?plan.to_drop,
            create = ?plan.to_create,
            "migration plan"
        );
        Ok(plan)
    }

    /// Runs `CREATE TABLE IF NOT EXISTS` for every declared table.
    ///
    /// The caller owns the transaction. The report's `from_version` is 0.
    pub fn create_all<S: Store + ?Sized>(&self, store: &S) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(MigrationKind::Create, 0, self.schema.version());
        for table in &self.schema.tables {
            store
                .execute_statement(&create_table_sql(table))
                .map_err(|e| e.in_step(Operation::Create, &table.name))?;
            report.created.push(table.name.clone());
        }
        Ok(report)
    }

    /// Plans and runs every drop, create, and rebuild step.
    ///
    /// The caller owns the transaction; on error it must roll back. The
    /// report's `from_version` is 0 until a lifecycle entry point fills it in.
    pub fn apply<S: Store + ?Sized>(&self, store: &S) -> Result<MigrationReport> {
        let plan = self.plan(store)?;
        let mut report = MigrationReport::new(MigrationKind::Upgrade, 0, self.schema.version());

        for name in &plan.to_drop {
            store
                .execute_statement(&drop_table_sql(name))
                .map_err(|e| e.in_step(Operation::Drop, name))?;
            report.dropped.push(name.clone());
        }

        for name in &plan.to_create {
            let table = self.schema.table(name)?;
            store
                .execute_statement(&create_table_sql(table))
                .map_err(|e| e.in_step(Operation::Create, name))?;
            report.created.push(name.clone());
        }

        for name in &plan.to_migrate {
            let table = self.schema.table(name)?;
            report.migrated.push(migrate_table(store, table)?);
        }

        Ok(report)
    }

    fn record(&self, conn: &Connection, report: &MigrationReport) -> Result<()> {
        history::record(conn, self.schema, report)
            .map_err(|e| e.in_step(Operation::RecordHistory, &self.schema.name))
    }
}

/// Rebuilds one table, carrying over the columns both versions share.
fn migrate_table<S: Store + ?Sized>(store: &S, table: &TableDef) -> Result<TableMigration> {
    let name = table.name.as_str();
    let temp = temp_table_name(name);

    store
        .execute_statement(&rename_table_sql(name, &temp))
        .map_err(|e| e.in_step(Operation::Rename, name))?;
    store
        .execute_statement(&create_table_sql(table))
        .map_err(|e| e.in_step(Operation::Create, name))?;

    let declared: HashSet<&str> = table.physical_column_names().into_iter().collect();
    let preserved: Vec<String> = store
        .column_names(&temp)
        .map_err(|e| e.in_step(Operation::Introspect, &temp))?
        .into_iter()
        .filter(|column| declared.contains(column.as_str()))
        .collect();

    let rows_copied = if preserved.is_empty() {
        0
    } else {
        store
            .execute_statement(&copy_columns_sql(name, &temp, &preserved))
            .map_err(|e| e.in_step(Operation::Copy, name))?
    };

    store
        .execute_statement(&drop_table_sql(&temp))
        .map_err(|e| e.in_step(Operation::Drop, &temp))?;

    debug!(table = name, columns = ?preserved, rows = rows_copied, "table migrated");
    Ok(TableMigration {
        table: name.to_string(),
        preserved_columns: preserved,
        rows_copied,
    })
}

/// Commits on success; on failure rolls back and returns the original error.
pub(crate) fn finish<T>(tx: Transaction<'_>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            warn!(error = %err, "rolling back");
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
