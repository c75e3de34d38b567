//! Content index: ingested posts with their embeddings and tag assignments

use super::tags::TagId;
use ahash::{HashMap, HashMapExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Identifier of a content item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text that gets embedded for a post: title and content joined by a space
pub fn embedding_text(title: &str, content: &str) -> String {
    format!("{} {}", title, content)
}

/// An ingested post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub vector: Vec<f32>,
    /// Assigned at ingestion, best match first
    pub tag_ids: Vec<TagId>,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn embedding_text(&self) -> String {
        embedding_text(&self.title, &self.content)
    }

    pub fn has_any_tag(&self, tags: &HashSet<TagId>) -> bool {
        self.tag_ids.iter().any(|id| tags.contains(id))
    }
}

/// Posts in insertion order with id lookup
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    items: Vec<ContentItem>,
    positions: HashMap<PostId, usize>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &PostId) -> Option<&ContentItem> {
        self.positions.get(id).map(|&pos| &self.items[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter()
    }

    /// Add a post. Returns false when the id is already present.
    pub fn insert(&mut self, item: ContentItem) -> bool {
        if self.positions.contains_key(&item.id) {
            return false;
        }
        self.positions.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        true
    }

    /// Posts carrying at least one of the given tags, in insertion order
    pub fn tagged_with_any(&self, tags: &HashSet<TagId>) -> Vec<&ContentItem> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.items.iter().filter(|p| p.has_any_tag(tags)).collect()
    }
}
