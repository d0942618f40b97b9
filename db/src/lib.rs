//! Schema catalogs, tool configuration, and fingerprints.
//!
//! This crate sits between schema documents on disk and the migration
//! engine: it loads revisions from JSON or YAML files into a
//! [`SchemaCatalog`], reads the YAML [`ToolConfig`] that says where a
//! database lives and how to open it, and computes the content
//! [`schema_fingerprint`] recorded alongside every applied revision.
//!
//! # Quick start
//!
//! ```no_run
//! use tableschema_db::{SchemaCatalog, ToolConfig, schema_fingerprint};
//!
//! // Load every revision found in a directory
//! let catalog = SchemaCatalog::from_dir("schemas/").unwrap();
//! let schema = catalog.latest("app").unwrap();
//! println!("app v{} ({})", schema.version(), schema_fingerprint(schema).unwrap());
//!
//! // Read the tool configuration
//! let config = ToolConfig::load("tableschema.yml").unwrap();
//! config.validate().unwrap();
//! ```

mod config;
mod error;
mod fingerprint;
mod loader;

pub use config::{JournalMode, SchemaSourceConfig, StoreConfig, ToolConfig};
pub use error::{DatabaseError, Result};
pub use fingerprint::schema_fingerprint;
pub use loader::{CatalogBuilder, CatalogSource, SchemaCatalog, load_schema_file};
