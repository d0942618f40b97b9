//! Schema catalog loading with builder pattern and fallback chains.
//!
//! Provides [`SchemaCatalog`], which indexes schema revisions by database
//! name and version, and [`CatalogBuilder`] for constructing a catalog from
//! multiple sources with automatic fallback.
//!
//! Schema documents are JSON (`*.json`) or YAML (`*.yaml`, `*.yml`). YAML is
//! decoded into the same document model as JSON and goes through the same
//! strict parsing and validation.
//!
//! # Loading patterns
//!
//! ```no_run
//! use tableschema_db::SchemaCatalog;
//!
//! // Every revision in a directory
//! let catalog = SchemaCatalog::from_dir("schemas/").unwrap();
//! let latest = catalog.latest("app").unwrap();
//! println!("app is at version {}", latest.version());
//!
//! // A single schema document
//! let catalog = SchemaCatalog::from_file("schemas/app-v3.yaml").unwrap();
//!
//! // Use the builder for a fallback chain
//! let catalog = SchemaCatalog::builder()
//!     .from_dir("/etc/app/schemas/")
//!     .from_file("schemas/app.json")
//!     .build()
//!     .unwrap();
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tableschema_core::SchemaDefinition;
use tracing::debug;

use crate::error::{DatabaseError, Result};

/// Describes where a [`SchemaCatalog`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// Built in code with [`SchemaCatalog::insert`].
    Empty,
    /// Loaded from a single schema document.
    File(PathBuf),
    /// Loaded from a directory of schema documents.
    Directory(PathBuf),
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<CatalogSource>),
}

/// Reads one schema document, choosing the format by file extension.
///
/// `.yaml` and `.yml` are read as YAML; anything else as JSON.
///
/// # Errors
///
/// Returns [`DatabaseError::IoError`] if the file cannot be read,
/// [`DatabaseError::YamlError`] for malformed YAML, and
/// [`DatabaseError::SchemaError`] if the document is not a valid schema.
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<SchemaDefinition> {
    let path = path.as_ref();
    let schema = if is_yaml(path) {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let document: serde_json::Value = serde_yaml::from_reader(reader)?;
        SchemaDefinition::from_json_value(document)?
    } else {
        let bytes = std::fs::read(path)?;
        SchemaDefinition::from_json_slice(&bytes)?
    };
    debug!(
        path = %path.display(),
        schema = %schema.name,
        version = schema.version,
        "loaded schema document"
    );
    Ok(schema)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

fn is_schema_document(path: &Path) -> bool {
    is_yaml(path) || path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Schema revisions indexed by database name, then version.
///
/// # Examples
///
/// ```
/// use tableschema_core::*;
/// use tableschema_db::SchemaCatalog;
///
/// let v1 = SchemaDefinition::new("app", 1)
///     .with_table(TableDef::new("t").with_column(ColumnDef::new("a", ColumnType::Text)));
/// let v2 = SchemaDefinition::new("app", 2)
///     .with_table(TableDef::new("t").with_column(ColumnDef::new("b", ColumnType::Text)));
///
/// let mut catalog = SchemaCatalog::new();
/// catalog.insert(v2).unwrap();
/// catalog.insert(v1).unwrap();
///
/// assert_eq!(catalog.revisions("app"), vec![1, 2]);
/// assert_eq!(catalog.latest("app").unwrap().version(), 2);
/// assert!(catalog.get("app", 3).is_none());
/// ```
#[derive(Debug)]
pub struct SchemaCatalog {
    schemas: BTreeMap<String, BTreeMap<u32, SchemaDefinition>>,
    source: CatalogSource,
}

impl SchemaCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            schemas: BTreeMap::new(),
            source: CatalogSource::Empty,
        }
    }

    /// Returns a new [`CatalogBuilder`] for configuring a fallback chain.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Loads a catalog holding the single revision in `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut catalog = Self::new();
        catalog.insert(load_schema_file(path)?)?;
        catalog.source = CatalogSource::File(path.to_path_buf());
        Ok(catalog)
    }

    /// Loads every `*.json`, `*.yaml`, and `*.yml` file in a directory.
    ///
    /// Files are read in name order. Other files and subdirectories are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the directory cannot be read,
    /// the first parse error encountered, or
    /// [`DatabaseError::DuplicateRevision`] if two files declare the same
    /// revision with different content.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() && is_schema_document(&file_path) {
                files.push(file_path);
            }
        }
        files.sort();

        let mut catalog = Self::new();
        for file_path in &files {
            catalog.insert(load_schema_file(file_path)?)?;
        }
        catalog.source = CatalogSource::Directory(path.to_path_buf());
        Ok(catalog)
    }

    /// Adds a revision.
    ///
    /// Re-inserting an identical revision is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::DuplicateRevision`] if a different schema is
    /// already registered under the same name and version.
    pub fn insert(&mut self, schema: SchemaDefinition) -> Result<()> {
        let revisions = self.schemas.entry(schema.name.clone()).or_default();
        match revisions.get(&schema.version) {
            Some(existing) if *existing == schema => Ok(()),
            Some(_) => Err(DatabaseError::DuplicateRevision {
                name: schema.name,
                version: schema.version,
            }),
            None => {
                revisions.insert(schema.version, schema);
                Ok(())
            }
        }
    }

    /// Looks up one revision.
    pub fn get(&self, name: &str, version: u32) -> Option<&SchemaDefinition> {
        self.schemas.get(name)?.get(&version)
    }

    /// Returns the highest-versioned revision of `name`.
    pub fn latest(&self, name: &str) -> Option<&SchemaDefinition> {
        self.schemas.get(name)?.values().next_back()
    }

    /// Picks the latest revision of `name`, or of the only database in the
    /// catalog when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidConfig`] if the name is unknown, or if
    /// no name was given and the catalog does not hold exactly one database.
    pub fn resolve(&self, name: Option<&str>) -> Result<&SchemaDefinition> {
        match name {
            Some(name) => self.latest(name).ok_or_else(|| {
                DatabaseError::InvalidConfig(format!("no schema named '{name}' in catalog"))
            }),
            None => {
                let mut names = self.names();
                match (names.next(), names.next()) {
                    (Some(only), None) => self
                        .latest(only)
                        .ok_or(DatabaseError::NoSourcesAvailable),
                    (None, _) => Err(DatabaseError::NoSourcesAvailable),
                    (Some(_), Some(_)) => Err(DatabaseError::InvalidConfig(
                        "catalog holds several schemas; pick one by name".into(),
                    )),
                }
            }
        }
    }

    /// Database names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(|s| s.as_str())
    }

    /// Known versions of `name`, ascending. Empty if the name is unknown.
    pub fn revisions(&self, name: &str) -> Vec<u32> {
        self.schemas
            .get(name)
            .map(|revisions| revisions.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if any revision of `name` is loaded.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Total number of revisions across all names.
    pub fn len(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if the catalog holds no revisions.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns a reference to the source metadata.
    pub fn source(&self) -> &CatalogSource {
        &self.source
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a [`SchemaCatalog`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`DatabaseError::NoSourcesAvailable`] is returned.
///
/// # Example
///
/// ```no_run
/// use tableschema_db::SchemaCatalog;
///
/// let catalog = SchemaCatalog::builder()
///     .from_dir("/opt/app/schemas/")
///     .from_file("/opt/app/schema.yaml")
///     .build()
///     .unwrap();
/// ```
pub struct CatalogBuilder {
    sources: Vec<CatalogSource>,
}

impl CatalogBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a directory of schema documents as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CatalogSource::Directory(path.into()));
        self
    }

    /// Adds a single schema document as a source.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(CatalogSource::File(path.into()));
        self
    }

    /// Attempts to load the catalog from configured sources in order.
    ///
    /// Returns the first successfully loaded catalog. If all sources fail,
    /// returns [`DatabaseError::NoSourcesAvailable`].
    pub fn build(self) -> Result<SchemaCatalog> {
        if self.sources.is_empty() {
            return Err(DatabaseError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                CatalogSource::Directory(path) => SchemaCatalog::from_dir(path),
                CatalogSource::File(path) => SchemaCatalog::from_file(path),
                CatalogSource::Empty | CatalogSource::Multiple(_) => continue,
            };

            match result {
                Ok(mut catalog) => {
                    catalog.source = CatalogSource::Multiple(all_sources);
                    return Ok(catalog);
                }
                Err(err) => debug!(source = ?source, error = %err, "schema source failed"),
            }
        }

        Err(DatabaseError::NoSourcesAvailable)
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
