//! Tagging and retrieval engine
//!
//! The `Engine` owns the knowledge graph and talks to the outside world only
//! through an [`EmbeddingProvider`] and an optional [`VectorStore`]:
//! - `ingest`: embed a post, attach it to matching tags or mint a new one
//! - `search`: embed a query, pick the best tags, return their posts
//! - `store_search`: nearest neighbours straight from the vector store
//! - `sync_to_store`: re-embed every tag and post into the vector store
//!
//! Mutations hold the graph's write lock for the whole score-then-write
//! sequence; searches score under a read lock.

mod retrieval;
mod sync;
mod tagging;

pub use retrieval::{HitKind, SearchResults, StoreHit};
pub use sync::SyncReport;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{BurrowError, Result};
use crate::graph::{GraphStats, GraphView, KnowledgeGraph, Tag, TagId};
use crate::vector::VectorStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Texts sent to the provider per batch call
pub const EMBED_BATCH_SIZE: usize = 32;

/// Tunables for tagging and retrieval
///
/// Attachment and search thresholds are deliberately separate: attachment is
/// conservative, search favours recall.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub attach_threshold: f32,
    pub max_tags_per_item: usize,
    pub search_threshold: f32,
    pub max_result_tags: usize,
    pub store_search_limit: usize,
    pub collection: String,
    pub sync_on_ingest: bool,
    pub embed_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            attach_threshold: 0.85,
            max_tags_per_item: 5,
            search_threshold: 0.80,
            max_result_tags: 5,
            store_search_limit: 8,
            collection: "burrow_embeddings".to_string(),
            sync_on_ingest: false,
            embed_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attach_threshold: config.tagging.attach_threshold,
            max_tags_per_item: config.tagging.max_tags_per_item,
            search_threshold: config.retrieval.search_threshold,
            max_result_tags: config.retrieval.max_result_tags,
            store_search_limit: config.retrieval.store_search_limit,
            collection: config.vector_store.collection.clone(),
            sync_on_ingest: config.vector_store.sync_on_ingest,
            embed_timeout: Duration::from_secs(config.embedding.timeout_secs),
            store_timeout: Duration::from_secs(config.vector_store.timeout_secs),
        }
    }
}

/// Semantic tagging and retrieval over an owned knowledge graph
pub struct Engine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Option<Arc<dyn VectorStore>>,
    pub(crate) graph: RwLock<KnowledgeGraph>,
    settings: EngineSettings,
}

impl Engine {
    /// Engine over an empty graph
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, settings: EngineSettings) -> Self {
        Self {
            embedder,
            store: None,
            graph: RwLock::new(KnowledgeGraph::new()),
            settings,
        }
    }

    /// Start from an existing graph (loaded from storage)
    pub fn with_graph(mut self, graph: KnowledgeGraph) -> Self {
        self.graph = RwLock::new(graph);
        self
    }

    pub fn with_vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Copy of the current graph
    pub async fn snapshot(&self) -> KnowledgeGraph {
        self.graph.read().await.clone()
    }

    pub async fn stats(&self) -> GraphStats {
        self.graph.read().await.stats()
    }

    /// Tags in insertion order, at most `limit`
    pub async fn tags(&self, limit: usize) -> Vec<Tag> {
        self.graph
            .read()
            .await
            .tags
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Co-occurrence neighbours of a tag; `None` if the tag is unknown
    pub async fn related_tags(&self, id: &TagId) -> Option<Vec<Tag>> {
        let graph = self.graph.read().await;
        graph.tags.get(id)?;
        Some(graph.tags.neighbours(id).into_iter().cloned().collect())
    }

    /// `{ nodes, links }` projection of the tag graph
    pub async fn graph_view(&self, limit: usize) -> GraphView {
        GraphView::from_tags(&self.graph.read().await.tags, limit)
    }

    /// Embed text, bounded by the configured timeout
    pub(crate) async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match tokio::time::timeout(self.settings.embed_timeout, self.embedder.embed(text)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(BurrowError::EmbeddingUnavailable(format!(
                "{} did not answer within {:?}",
                self.embedder.model_name(),
                self.settings.embed_timeout
            ))),
        }
    }

    /// Embed texts in chunks of [`EMBED_BATCH_SIZE`], each chunk bounded by
    /// the configured timeout. Output order matches input order.
    pub(crate) async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            let batch = match tokio::time::timeout(
                self.settings.embed_timeout,
                self.embedder.embed_batch(chunk),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(BurrowError::EmbeddingUnavailable(format!(
                        "{} did not answer a batch of {} within {:?}",
                        self.embedder.model_name(),
                        chunk.len(),
                        self.settings.embed_timeout
                    )))
                }
            };
            if batch.len() != chunk.len() {
                return Err(BurrowError::EmbeddingUnavailable(format!(
                    "expected {} embeddings, got {}",
                    chunk.len(),
                    batch.len()
                )));
            }
            vectors.extend(batch);
        }
        Ok(vectors)
    }

    pub(crate) fn embedding_dimension(&self) -> usize {
        self.embedder.dimension()
    }

    fn require_store(&self) -> Result<&Arc<dyn VectorStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| BurrowError::StoreUnavailable("no vector store configured".to_string()))
    }

    /// Run a store call, bounded by the configured timeout
    async fn with_store_timeout<T, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, crate::vector::VectorStoreError>>,
    {
        match tokio::time::timeout(self.settings.store_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(BurrowError::StoreUnavailable(format!(
                "{} timed out after {:?}",
                what, self.settings.store_timeout
            ))),
        }
    }
}
