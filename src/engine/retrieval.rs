//! Query answering: tag-level ranking and vector store lookups

use super::Engine;
use crate::error::Result;
use crate::graph::{cosine_similarity, select_above, ContentItem, PostId, Tag, TagId};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// Tags clearing the search threshold and the posts attached to them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Best match first
    pub tags: Vec<Tag>,
    /// Union of posts carrying any selected tag, in ingestion order
    pub posts: Vec<ContentItem>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.posts.is_empty()
    }
}

/// What a vector store hit resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Tag,
    Post,
    Unknown,
}

/// A vector store hit joined with the in-memory record it names
#[derive(Debug, Clone, Serialize)]
pub struct StoreHit {
    pub id: String,
    pub score: f32,
    pub kind: HitKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<ContentItem>,
}

impl Engine {
    /// Rank tags against the query and collect their posts.
    ///
    /// No tag above the threshold is an empty result, not an error.
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let q_vector = self.embed(query).await?;

        let graph = self.graph.read().await;

        let scores: Vec<f32> = graph
            .tags
            .iter()
            .map(|tag| cosine_similarity(&q_vector, &tag.vector))
            .collect();

        let tags: Vec<Tag> = select_above(
            &scores,
            self.settings.search_threshold,
            self.settings.max_result_tags,
        )
        .into_iter()
        .filter_map(|pos| graph.tags.at(pos).cloned())
        .collect();

        let selected: HashSet<TagId> = tags.iter().map(|t| t.id.clone()).collect();
        let posts: Vec<ContentItem> = graph
            .posts
            .tagged_with_any(&selected)
            .into_iter()
            .cloned()
            .collect();

        debug!(
            "Query matched {} tag(s) and {} post(s)",
            tags.len(),
            posts.len()
        );

        Ok(SearchResults { tags, posts })
    }

    /// Nearest neighbours from the vector store, resolved against the graph.
    ///
    /// Hits whose id is no longer known are kept with kind `Unknown`.
    pub async fn store_search(&self, query: &str, limit: Option<usize>) -> Result<Vec<StoreHit>> {
        let store = self.require_store()?;
        let limit = limit.unwrap_or(self.settings.store_search_limit);
        let q_vector = self.embed(query).await?;

        let points = self
            .with_store_timeout(
                "search",
                store.search(&self.settings.collection, &q_vector, limit),
            )
            .await?;

        let graph = self.graph.read().await;
        Ok(points
            .into_iter()
            .map(|point| {
                let tag = graph.tags.get(&TagId::from(point.id.as_str())).cloned();
                let post = graph.posts.get(&PostId::from(point.id.as_str())).cloned();
                let kind = match (&tag, &post) {
                    (Some(_), _) => HitKind::Tag,
                    (None, Some(_)) => HitKind::Post,
                    (None, None) => HitKind::Unknown,
                };
                StoreHit {
                    id: point.id,
                    score: point.score,
                    kind,
                    tag,
                    post,
                }
            })
            .collect())
    }
}
