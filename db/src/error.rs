//! Error types for schema catalog and configuration operations.
//!
//! Provides a unified error type covering all failure modes: I/O,
//! serialization, schema parsing, configuration validation, and revision
//! conflicts between catalog sources.

use thiserror::Error;

/// Errors that can occur while loading schemas or configuration.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A schema document parsed but was rejected.
    #[error("schema error: {0}")]
    SchemaError(#[from] tableschema_core::SchemaError),

    /// Configuration validation failure (e.g., no store location).
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Two sources declare the same revision with different content.
    #[error("conflicting definitions for schema '{name}' version {version}")]
    DuplicateRevision { name: String, version: u32 },

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;
