//! SQLite migration engine for declarative schemas.
//!
//! Given a [`SchemaDefinition`](tableschema_core::SchemaDefinition), this
//! crate creates a fresh database or upgrades an existing one in place,
//! keeping the data of every column that survives the change. Each create or
//! upgrade is a single transaction: it either lands completely, version bump
//! included, or leaves the database exactly as it was.
//!
//! # Architecture
//!
//! - **`introspect`**: the [`Store`] trait the engine works through, and its
//!   implementation for [`rusqlite::Connection`]
//! - **`ddl`**: statement generation from table definitions
//! - **`plan`**: the create/drop/migrate classification
//! - **`migration`**: [`Migrator`], which runs the steps transactionally
//! - **`history`**: `user_version` tracking and the applied-revision log
//! - **`manager`**: [`SchemaManager`], which picks create, upgrade, or nothing
//!   on open
//! - **`data`**: JSON row import and export
//!
//! # Quick start
//!
//! ```
//! use tableschema_core::SchemaDefinition;
//! use tableschema_sqlite::{SchemaManager, Store};
//!
//! let schema = SchemaDefinition::from_json_str(r#"{
//!     "name": "app",
//!     "version": 1,
//!     "tables": [
//!         { "name": "notes", "autoPrimaryKey": true,
//!           "columns": [ { "name": "body", "type": "text", "notNull": true } ] }
//!     ]
//! }"#).unwrap();
//!
//! let manager = SchemaManager::open_in_memory(schema).unwrap();
//! assert_eq!(
//!     manager.connection().column_names("notes").unwrap(),
//!     vec!["_id", "body"]
//! );
//! assert_eq!(manager.status().unwrap().stored_version, 1);
//! ```

pub mod ddl;
mod data;
mod error;
mod history;
mod introspect;
mod manager;
mod migration;
mod plan;

pub use data::{TableRows, export_table, import_rows};
pub use error::{Operation, Result, SqliteError};
pub use history::{HistoryEntry, history_entries, latest_fingerprint, stored_version};
pub use introspect::{Store, column_values, row_count};
pub use manager::{DatabaseStatus, SchemaManager, TableStatus, database_status};
pub use migration::{MigrationKind, MigrationReport, Migrator, TableMigration};
pub use plan::{MigrationPlan, plan};
