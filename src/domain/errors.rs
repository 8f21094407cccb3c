//! Domain error types
//!
//! This module defines the error hierarchy for the semantic layer. Every error
//! is scoped to a single entity build where possible, so the rebuild
//! coordinator can isolate failures per entity.

use thiserror::Error;

/// Main semantic layer error type
#[derive(Debug, Error)]
pub enum SemanticError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An expected column is absent from a source relation
    #[error("Schema error in {entity}: column '{column}' not found in source")]
    Schema { entity: String, column: String },

    /// A value failed strict type coercion
    #[error("Cast error: {0}")]
    Cast(#[from] CastError),

    /// Upstream source errors (remote database, raw store)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Entity catalog errors (unknown entity, cycles, layer violations)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Entity evaluation errors
    #[error("Evaluation of {entity} failed: {message}")]
    Evaluation { entity: String, message: String },

    /// Materialized snapshot store errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database-related errors (generic)
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SemanticError {
    /// Builds an evaluation error for the given entity
    pub fn evaluation(entity: impl Into<String>, message: impl Into<String>) -> Self {
        SemanticError::Evaluation {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Builds a schema-mismatch error naming the offending entity and column
    pub fn schema(entity: impl Into<String>, column: impl Into<String>) -> Self {
        SemanticError::Schema {
            entity: entity.into(),
            column: column.into(),
        }
    }
}

/// Strict type coercion failure
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot cast '{value}' to {target} (column {column})")]
pub struct CastError {
    /// Canonical column name
    pub column: String,

    /// Rendered input value
    pub value: String,

    /// Target semantic type
    pub target: String,
}

/// Upstream source errors
///
/// These errors don't expose third-party driver types.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to connect to the remote source
    #[error("Failed to connect to source: {0}")]
    ConnectionFailed(String),

    /// The requested table does not exist
    #[error("Source table not found: {0}")]
    TableNotFound(String),

    /// Query against the source failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A value in the source could not be decoded
    #[error("Unsupported column type for {column}: {type_name}")]
    UnsupportedType { column: String, type_name: String },

    /// The local raw store could not be read or written
    #[error("Raw store error: {0}")]
    RawStore(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for SemanticError {
    fn from(err: std::io::Error) -> Self {
        SemanticError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SemanticError {
    fn from(err: serde_json::Error) -> Self {
        SemanticError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SemanticError {
    fn from(err: toml::de::Error) -> Self {
        SemanticError::Configuration(format!("TOML parse error: {err}"))
    }
}
