use crate::embedding::EmbeddingError;
use crate::vector::VectorStoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Burrow
#[derive(Error, Debug)]
pub enum BurrowError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// The embedding provider errored, rate-limited or timed out
    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The vector store is unreachable, timed out or not configured
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// Vector store rejected a request (dimension mismatch, bad vector)
    #[error("Vector store error: {0}")]
    VectorStore(VectorStoreError),

    /// No tag with this id
    #[error("Unknown tag: {0}")]
    TagNotFound(String),

    /// Seed snapshot could not be read or applied
    #[error("Seed error: {0}")]
    Seed(String),

    /// Persistence layer errors other than SQL failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<EmbeddingError> for BurrowError {
    fn from(err: EmbeddingError) -> Self {
        BurrowError::EmbeddingUnavailable(err.to_string())
    }
}

impl From<VectorStoreError> for BurrowError {
    fn from(err: VectorStoreError) -> Self {
        if err.is_connectivity() {
            BurrowError::StoreUnavailable(err.to_string())
        } else {
            BurrowError::VectorStore(err)
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Burrow operations
pub type Result<T> = std::result::Result<T, BurrowError>;
