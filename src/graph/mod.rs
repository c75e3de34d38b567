//! Tag graph and content index
//!
//! The in-memory knowledge graph the tagging and retrieval engines work on:
//! - `TagGraph`: tags with frozen vectors and symmetric co-occurrence edges
//! - `ContentIndex`: ingested posts with their vectors and tag assignments
//! - catalog records (topics, keywords, relations) carried over from seeds

mod catalog;
mod content;
mod similarity;
mod tags;
mod view;

pub use catalog::{normalize_relation_type, Keyword, Relation, Topic, TAGGED_WITH};
pub use content::{embedding_text, ContentIndex, ContentItem, PostId};
pub use similarity::{cosine_similarity, magnitude, select_above};
pub use tags::{Tag, TagGraph, TagId};
pub use view::{GraphLink, GraphNode, GraphView};

use serde::Serialize;

/// Everything the engine owns
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    pub tags: TagGraph,
    pub posts: ContentIndex,
    pub topics: Vec<Topic>,
    pub keywords: Vec<Keyword>,
    pub relations: Vec<Relation>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.posts.is_empty()
            && self.topics.is_empty()
            && self.keywords.is_empty()
            && self.relations.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            tags: self.tags.len(),
            posts: self.posts.len(),
            edges: self.tags.edge_count(),
            topics: self.topics.len(),
            keywords: self.keywords.len(),
            relations: self.relations.len(),
        }
    }
}

/// Entity counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub tags: usize,
    pub posts: usize,
    pub edges: usize,
    pub topics: usize,
    pub keywords: usize,
    pub relations: usize,
}
