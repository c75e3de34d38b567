//! Vector store boundary
//!
//! Named collections of `(id, vector, payload)` points answering nearest
//! neighbour queries by cosine similarity. Two backends:
//! - `MemoryVectorStore`: in-process HNSW graphs
//! - `QdrantStore`: Qdrant over its REST API

mod memory;
mod qdrant;

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

use crate::config::VectorStoreConfig;
use crate::error::{BurrowError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Metadata stored next to a vector
pub type Payload = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Vector store unreachable: {0}")]
    Unreachable(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Unsupported distance metric: {0:?}")]
    UnsupportedDistance(Distance),
}

impl VectorStoreError {
    /// Whether the error means the store could not be talked to at all
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::RequestError(_))
    }
}

/// Distance metric of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPoint {
    pub id: String,
    /// Cosine similarity, higher is closer
    pub score: f32,
    pub payload: Payload,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if missing.
    ///
    /// An existing collection keeps its dimension; asking for another one is
    /// an error rather than a silent renegotiation.
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> std::result::Result<(), VectorStoreError>;

    /// Insert or replace the point with this id
    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        payload: Payload,
    ) -> std::result::Result<(), VectorStoreError>;

    /// Up to `limit` nearest points, best first
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> std::result::Result<Vec<ScoredPoint>, VectorStoreError>;

    fn backend_name(&self) -> &str;
}

/// Build the store named in the configuration; `None` for backend "none"
pub fn store_from_config(config: &VectorStoreConfig) -> Result<Option<Arc<dyn VectorStore>>> {
    match config.backend.as_str() {
        "none" => Ok(None),
        "memory" => Ok(Some(Arc::new(MemoryVectorStore::new(
            config.hnsw_m,
            config.hnsw_ef_construction,
            config.hnsw_ef_search,
        )))),
        "qdrant" => {
            let api_key = std::env::var(&config.api_key_env).ok();
            let store = QdrantStore::new(
                &config.url,
                api_key,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Some(Arc::new(store)))
        }
        other => Err(BurrowError::Config(format!(
            "Unknown vector store backend: {}",
            other
        ))),
    }
}
