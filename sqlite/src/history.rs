//! Version tracking and the applied-revision log.
//!
//! The current version lives in SQLite's `PRAGMA user_version`, which is
//! part of the database header and so commits or rolls back with the
//! surrounding transaction. Every create or upgrade also appends a row to the
//! `tableschema_history` table inside that same transaction.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tableschema_core::{HISTORY_TABLE, SchemaDefinition};
use tableschema_db::schema_fingerprint;

use crate::error::Result;
use crate::introspect::Store;
use crate::migration::MigrationReport;

/// One applied create or upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub schema_name: String,
    pub from_version: u32,
    pub to_version: u32,
    /// Fingerprint of the schema that was applied.
    pub fingerprint: String,
    pub tables_created: usize,
    pub tables_dropped: usize,
    pub tables_migrated: usize,
    /// RFC 3339 UTC timestamp.
    pub applied_at: String,
}

/// Reads the stored schema version. A new database reports 0.
pub fn stored_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

pub(crate) fn set_stored_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {version}"))?;
    Ok(())
}

pub(crate) fn ensure_history_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {HISTORY_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            schema_name TEXT NOT NULL,
            from_version INTEGER NOT NULL,
            to_version INTEGER NOT NULL,
            fingerprint TEXT NOT NULL,
            tables_created INTEGER NOT NULL DEFAULT 0,
            tables_dropped INTEGER NOT NULL DEFAULT 0,
            tables_migrated INTEGER NOT NULL DEFAULT 0,
            applied_at TEXT NOT NULL
        )"
    ))?;
    Ok(())
}

/// Appends the history row for `report` and moves `user_version` to its
/// target version.
pub(crate) fn record(
    conn: &Connection,
    schema: &SchemaDefinition,
    report: &MigrationReport,
) -> Result<()> {
    ensure_history_table(conn)?;
    let fingerprint = schema_fingerprint(schema)?;
    let applied_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO {HISTORY_TABLE}
                (schema_name, from_version, to_version, fingerprint,
                 tables_created, tables_dropped, tables_migrated, applied_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ),
        params![
            schema.name,
            report.from_version,
            report.to_version,
            fingerprint,
            report.created.len() as i64,
            report.dropped.len() as i64,
            report.migrated.len() as i64,
            applied_at,
        ],
    )?;
    set_stored_version(conn, report.to_version)
}

/// All history rows, oldest first. Empty if the table does not exist.
pub fn history_entries(conn: &Connection) -> Result<Vec<HistoryEntry>> {
    if !has_history_table(conn)? {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare(&format!(
        "SELECT id, schema_name, from_version, to_version, fingerprint,
                tables_created, tables_dropped, tables_migrated, applied_at
         FROM {HISTORY_TABLE} ORDER BY id"
    ))?;
    let entries = stmt
        .query_map([], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                schema_name: row.get(1)?,
                from_version: row.get(2)?,
                to_version: row.get(3)?,
                fingerprint: row.get(4)?,
                tables_created: row.get::<_, i64>(5)? as usize,
                tables_dropped: row.get::<_, i64>(6)? as usize,
                tables_migrated: row.get::<_, i64>(7)? as usize,
                applied_at: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Fingerprint recorded by the most recent create or upgrade of `schema_name`.
pub fn latest_fingerprint(conn: &Connection, schema_name: &str) -> Result<Option<String>> {
    if !has_history_table(conn)? {
        return Ok(None);
    }
    let fingerprint = conn
        .query_row(
            &format!(
                "SELECT fingerprint FROM {HISTORY_TABLE}
                 WHERE schema_name = ?1 ORDER BY id DESC LIMIT 1"
            ),
            [schema_name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(fingerprint)
}

fn has_history_table(conn: &Connection) -> Result<bool> {
    // The history table is hidden from `Store::table_names`, so ask the catalog directly
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [HISTORY_TABLE],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Returns `true` if the database has no user tables and no recorded version.
pub(crate) fn is_fresh(conn: &Connection) -> Result<bool> {
    Ok(stored_version(conn)? == 0 && conn.table_names()?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationKind;
    use tableschema_core::{ColumnDef, ColumnType, TableDef};

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new("app", 2).with_table(
            TableDef::new("t").with_column(ColumnDef::new("a", ColumnType::Text)),
        )
    }

    #[test]
    fn test_user_version_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 0);
        set_stored_version(&conn, 7).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 7);
    }

    #[test]
    fn test_user_version_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        set_stored_version(&conn, 1).unwrap();
        let tx = conn.transaction().unwrap();
        set_stored_version(&tx, 2).unwrap();
        tx.rollback().unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_record_and_read_history() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(history_entries(&conn).unwrap().is_empty());
        assert_eq!(latest_fingerprint(&conn, "app").unwrap(), None);

        let mut report = MigrationReport::new(MigrationKind::Upgrade, 1, 2);
        report.created.push("t".into());
        record(&conn, &schema(), &report).unwrap();

        let entries = history_entries(&conn).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.schema_name, "app");
        assert_eq!((entry.from_version, entry.to_version), (1, 2));
        assert_eq!(entry.tables_created, 1);
        assert_eq!(entry.tables_dropped, 0);
        assert_eq!(entry.fingerprint, schema_fingerprint(&schema()).unwrap());
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.applied_at).is_ok());

        assert_eq!(stored_version(&conn).unwrap(), 2);
        assert_eq!(
            latest_fingerprint(&conn, "app").unwrap(),
            Some(entry.fingerprint.clone())
        );
    }

    #[test]
    fn test_is_fresh() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(is_fresh(&conn).unwrap());
        ensure_history_table(&conn).unwrap();
        assert!(is_fresh(&conn).unwrap());
        conn.execute_batch("CREATE TABLE legacy (x TEXT)").unwrap();
        assert!(!is_fresh(&conn).unwrap());
    }
}
