//! Ingestion: attach a post to its closest tags or mint a new one

use super::Engine;
use crate::error::Result;
use crate::graph::{
    cosine_similarity, embedding_text, select_above, ContentItem, PostId, Tag, TagId,
};
use crate::vector::{Distance, Payload};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

/// Name for a tag minted from an item with an empty title
fn placeholder_name(id: &TagId) -> String {
    let short: String = id.as_str().chars().take(8).collect();
    format!("untitled-{}", short)
}

impl Engine {
    /// Ingest one post and fold it into the tag graph.
    ///
    /// Embedding happens before any state is touched, so a provider failure
    /// leaves the graph unchanged.
    pub async fn ingest(&self, title: &str, content: &str) -> Result<ContentItem> {
        let vector = self.embed(&embedding_text(title, content)).await?;

        let item = {
            let mut graph = self.graph.write().await;

            let scores: Vec<f32> = graph
                .tags
                .iter()
                .map(|tag| cosine_similarity(&vector, &tag.vector))
                .collect();

            let mut tag_ids: Vec<TagId> = select_above(
                &scores,
                self.settings.attach_threshold,
                self.settings.max_tags_per_item,
            )
            .into_iter()
            .filter_map(|pos| graph.tags.at(pos).map(|t| t.id.clone()))
            .collect();

            debug!(
                "Scored against {} tags, {} above {}",
                scores.len(),
                tag_ids.len(),
                self.settings.attach_threshold
            );

            if tag_ids.is_empty() {
                let id = TagId::generate();
                let name = if title.is_empty() {
                    placeholder_name(&id)
                } else {
                    title.to_lowercase()
                };
                info!("Minting tag '{}' ({})", name, id);
                graph.tags.insert(Tag::new(id.clone(), name, vector.clone()));
                tag_ids.push(id);
            }

            let item = ContentItem {
                id: PostId::generate(),
                title: title.to_string(),
                content: content.to_string(),
                vector,
                tag_ids,
                created_at: Utc::now(),
            };
            graph.posts.insert(item.clone());

            for (i, a) in item.tag_ids.iter().enumerate() {
                for b in &item.tag_ids[i + 1..] {
                    graph.tags.connect(a, b);
                }
            }

            item
        };

        info!(
            "Ingested post {} with {} tag(s)",
            item.id,
            item.tag_ids.len()
        );

        if self.settings.sync_on_ingest && self.store.is_some() {
            if let Err(e) = self.push_post(&item).await {
                warn!("Post {} not pushed to vector store: {}", item.id, e);
            }
        }

        Ok(item)
    }

    async fn push_post(&self, item: &ContentItem) -> Result<()> {
        let store = self.require_store()?;
        let mut payload = Payload::new();
        payload.insert("type".to_string(), json!("post"));
        payload.insert("id".to_string(), json!(item.id.as_str()));
        payload.insert("title".to_string(), json!(item.title));

        self.with_store_timeout(
            "ensure collection",
            store.ensure_collection(
                &self.settings.collection,
                self.embedding_dimension(),
                Distance::Cosine,
            ),
        )
        .await?;
        self.with_store_timeout(
            "upsert",
            store.upsert(&self.settings.collection, item.id.as_str(), &item.vector, payload),
        )
        .await
    }
}
