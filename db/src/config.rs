//! Tool configuration for opening managed databases.
//!
//! Defines the YAML-serializable configuration that says where the database
//! lives, which pragmas to apply when opening it, and where to find the
//! schema it should be reconciled against. Every section and field is
//! optional in the document; command-line flags override file values.
//!
//! # Example YAML
//!
//! ```yaml
//! store:
//!   path: data/app.db
//!   busy_timeout_ms: 5000
//!   journal_mode: wal
//!   foreign_keys: true
//! schema:
//!   dir: schemas/
//!   name: app
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite journal mode applied when opening a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead logging.
    Wal,
    /// Rollback journal deleted at commit (SQLite's default).
    #[default]
    Delete,
    /// Journal kept in memory.
    Memory,
}

impl JournalMode {
    /// Returns the `journal_mode` pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
            Self::Memory => "memory",
        }
    }
}

/// Where the managed database lives and how its connection is set up.
///
/// # Examples
///
/// ```
/// # use tableschema_db::{JournalMode, StoreConfig};
/// let store: StoreConfig = serde_yaml::from_str("path: app.db\njournal_mode: wal\n").unwrap();
/// assert_eq!(store.journal_mode.pragma_value(), "wal");
/// assert_eq!(store.busy_timeout_ms, 5000);
/// assert!(!store.in_memory);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Use a private in-memory database instead of `path`.
    #[serde(default)]
    pub in_memory: bool,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// Enforce foreign key constraints on the connection.
    #[serde(default)]
    pub foreign_keys: bool,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            in_memory: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
            foreign_keys: false,
        }
    }
}

impl StoreConfig {
    /// A store backed by the database file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// A private in-memory store.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    /// Checks that the store has somewhere to live.
    pub fn validate(&self) -> Result<()> {
        if !self.in_memory && self.path.is_none() {
            return Err(DatabaseError::InvalidConfig(
                "store needs either `path` or `in_memory: true`".into(),
            ));
        }
        Ok(())
    }
}

/// Where to load the declared schema from.
///
/// `file` names a single schema document; `dir` names a catalog directory.
/// With a catalog, `name` picks the database (optional when the catalog
/// holds exactly one) and the latest revision is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SchemaSourceConfig {
    /// Checks that at least one source location is set.
    pub fn validate(&self) -> Result<()> {
        if self.file.is_none() && self.dir.is_none() {
            return Err(DatabaseError::InvalidConfig(
                "schema source needs either `file` or `dir`".into(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration file.
///
/// Loaded from a YAML file (typically `tableschema.yml` next to the
/// database) by the command-line tool.
///
/// # Examples
///
/// ```no_run
/// use tableschema_db::ToolConfig;
///
/// let config = ToolConfig::load("tableschema.yml").unwrap();
/// config.validate().unwrap();
/// println!("database at {:?}", config.store.path);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schema: SchemaSourceConfig,
}

impl ToolConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::DatabaseError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Validates both sections.
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.schema.validate()
    }
}
