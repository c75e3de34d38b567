//! Bulk re-embedding of the graph into the vector store

use super::Engine;
use crate::error::Result;
use crate::graph::KnowledgeGraph;
use crate::vector::{Distance, Payload};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tracing::info;

/// Outcome of a bulk sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tags: usize,
    pub posts: usize,
    pub duration_ms: u64,
}

/// Work item captured under the read lock
struct Pending {
    id: String,
    text: String,
    /// Already-known vector; `None` means embed `text`
    vector: Option<Vec<f32>>,
    payload: Payload,
}

/// Tags by name and posts by `title content`, tags first
fn pending_items(graph: &KnowledgeGraph, reuse_post_vectors: bool) -> (Vec<Pending>, usize) {
    let mut items: Vec<Pending> = graph
        .tags
        .iter()
        .map(|tag| {
            let mut payload = Payload::new();
            payload.insert("type".to_string(), json!("tag"));
            payload.insert("id".to_string(), json!(tag.id.as_str()));
            payload.insert("name".to_string(), json!(tag.name));
            Pending {
                id: tag.id.to_string(),
                text: tag.name.clone(),
                vector: None,
                payload,
            }
        })
        .collect();
    let tag_count = items.len();

    items.extend(graph.posts.iter().map(|post| {
        let mut payload = Payload::new();
        payload.insert("type".to_string(), json!("post"));
        payload.insert("id".to_string(), json!(post.id.as_str()));
        payload.insert("title".to_string(), json!(post.title));
        Pending {
            id: post.id.to_string(),
            text: post.embedding_text(),
            vector: reuse_post_vectors.then(|| post.vector.clone()),
            payload,
        }
    }));

    (items, tag_count)
}

impl Engine {
    /// Re-embed every tag (by name) and post (title + content) and upsert
    /// them by id. Safe to repeat.
    pub async fn sync_to_store(&self) -> Result<SyncReport> {
        let report = self.push_graph(false).await?;
        info!(
            "Synced {} tags & {} posts ({}ms)",
            report.tags, report.posts, report.duration_ms
        );
        Ok(report)
    }

    /// Refill a store that does not outlive the process (the in-memory
    /// backend) from the graph. Post vectors are reused; tag names are
    /// embedded.
    pub async fn restore_store(&self) -> Result<SyncReport> {
        let report = self.push_graph(true).await?;
        info!(
            "Restored {} tags & {} posts into the vector store ({}ms)",
            report.tags, report.posts, report.duration_ms
        );
        Ok(report)
    }

    async fn push_graph(&self, reuse_post_vectors: bool) -> Result<SyncReport> {
        let start = Instant::now();
        let store = self.require_store()?;

        self.with_store_timeout(
            "ensure collection",
            store.ensure_collection(
                &self.settings.collection,
                self.embedding_dimension(),
                Distance::Cosine,
            ),
        )
        .await?;

        let (items, tag_count) = {
            let graph = self.graph.read().await;
            pending_items(&graph, reuse_post_vectors)
        };
        let post_count = items.len() - tag_count;

        let texts: Vec<String> = items
            .iter()
            .filter(|p| p.vector.is_none())
            .map(|p| p.text.clone())
            .collect();
        let mut computed = self.embed_batch(&texts).await?.into_iter();

        for pending in items {
            let vector = match pending.vector {
                Some(v) => v,
                None => match computed.next() {
                    Some(v) => v,
                    None => break,
                },
            };
            self.with_store_timeout(
                "upsert",
                store.upsert(&self.settings.collection, &pending.id, &vector, pending.payload),
            )
            .await?;
        }

        Ok(SyncReport {
            tags: tag_count,
            posts: post_count,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
