//! Seed snapshots
//!
//! JSON documents with optional `topics`, `keywords`, `tags`, `posts` and
//! `relations` arrays. Importing computes every missing vector first and only
//! then merges into the engine's graph, so a failed import changes nothing.

use crate::engine::Engine;
use crate::error::{BurrowError, Result};
use crate::graph::{
    embedding_text, normalize_relation_type, ContentItem, KnowledgeGraph, Keyword, PostId,
    Relation, Tag, TagGraph, TagId, Topic, TAGGED_WITH,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<SeedTopic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<SeedKeyword>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<SeedTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<SeedPost>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<SeedRelation>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedTopic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedKeyword {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedTag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedPost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    /// Tag ids or names; wins over `tags` when both are given
    #[serde(rename = "tagIds", default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedRelation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// What an import added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub topics: usize,
    pub keywords: usize,
    pub tags: usize,
    pub posts: usize,
    pub relations: usize,
    pub embedded: usize,
}

/// Read and parse a seed file
pub fn read_seed(path: &Path) -> Result<SeedFile> {
    if !path.exists() {
        return Err(BurrowError::Seed(format!(
            "Seed file not found: {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path).map_err(|e| BurrowError::Io {
        source: e,
        context: format!("Failed to read seed file: {:?}", path),
    })?;
    parse_seed(&raw)
}

pub fn parse_seed(raw: &str) -> Result<SeedFile> {
    serde_json::from_str(raw).map_err(|e| BurrowError::Json {
        source: e,
        context: "Invalid seed snapshot".to_string(),
    })
}

/// Write a seed file
pub fn write_seed(path: &Path, seed: &SeedFile) -> Result<()> {
    let json = serde_json::to_string_pretty(seed).map_err(|e| BurrowError::Json {
        source: e,
        context: "Failed to serialize seed snapshot".to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| BurrowError::Io {
        source: e,
        context: format!("Failed to write seed file: {:?}", path),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Resolve a tag reference by id, then by case-insensitive name
fn resolve_tag(tags: &TagGraph, reference: &str) -> Option<TagId> {
    if reference.is_empty() {
        return None;
    }
    let id = TagId::from(reference);
    if tags.contains(&id) {
        return Some(id);
    }
    tags.find_by_name(reference).map(|t| t.id.clone())
}

/// Seed vectors of the right length are kept; the rest queue their text
fn given_or_queue(
    given: Option<Vec<f32>>,
    text: String,
    dimension: usize,
    queue: &mut Vec<String>,
) -> Option<Vec<f32>> {
    match given {
        Some(v) if !v.is_empty() && v.len() == dimension => Some(v),
        other => {
            if let Some(v) = other.filter(|v| !v.is_empty()) {
                warn!(
                    "Seed vector has {} dimensions, expected {}; recomputing",
                    v.len(),
                    dimension
                );
            }
            queue.push(text);
            None
        }
    }
}

fn fill_vector(
    slot: Option<Vec<f32>>,
    computed: &mut impl Iterator<Item = Vec<f32>>,
) -> Result<Vec<f32>> {
    match slot {
        Some(v) => Ok(v),
        None => computed.next().ok_or_else(|| {
            BurrowError::EmbeddingUnavailable("embedding batch came back short".to_string())
        }),
    }
}

impl Engine {
    /// Merge a seed snapshot into the graph
    pub async fn import_seed(&self, seed: SeedFile) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        let dimension = self.embedding_dimension();
        let mut queue = Vec::new();

        let keywords: Vec<(String, Option<Vec<f32>>)> = seed
            .keywords
            .unwrap_or_default()
            .into_iter()
            .map(|k| {
                let name = k.name.unwrap_or_default();
                let slot = given_or_queue(None, name.clone(), dimension, &mut queue);
                (name, slot)
            })
            .collect();

        let topics: Vec<(SeedTopic, Option<Vec<f32>>)> = seed
            .topics
            .unwrap_or_default()
            .into_iter()
            .map(|t| {
                let text = embedding_text(
                    t.title.as_deref().unwrap_or_default(),
                    t.summary.as_deref().unwrap_or_default(),
                );
                let slot = given_or_queue(None, text, dimension, &mut queue);
                (t, slot)
            })
            .collect();

        let tags: Vec<(SeedTag, Option<Vec<f32>>)> = seed
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|mut t| {
                let name = t.name.clone().unwrap_or_default();
                let slot = given_or_queue(t.vector.take(), name, dimension, &mut queue);
                (t, slot)
            })
            .collect();

        let posts: Vec<(SeedPost, Option<Vec<f32>>)> = seed
            .posts
            .unwrap_or_default()
            .into_iter()
            .map(|mut p| {
                let text = embedding_text(
                    p.title.as_deref().unwrap_or_default(),
                    p.content.as_deref().unwrap_or_default(),
                );
                let slot = given_or_queue(p.vector.take(), text, dimension, &mut queue);
                (p, slot)
            })
            .collect();

        report.embedded = queue.len();
        let mut computed = self.embed_batch(&queue).await?.into_iter();

        let mut keyword_items = Vec::with_capacity(keywords.len());
        for (name, slot) in keywords {
            keyword_items.push(Keyword {
                id: Uuid::new_v4().to_string(),
                name,
                vector: fill_vector(slot, &mut computed)?,
                connections: BTreeSet::new(),
            });
        }

        let mut topic_items = Vec::with_capacity(topics.len());
        for (t, slot) in topics {
            topic_items.push(Topic {
                id: Uuid::new_v4().to_string(),
                title: non_empty(&t.title).unwrap_or("untitled").to_string(),
                summary: t.summary.unwrap_or_default(),
                keywords: t.keywords,
                vector: fill_vector(slot, &mut computed)?,
            });
        }

        let mut tag_items = Vec::with_capacity(tags.len());
        for (t, slot) in tags {
            let id = non_empty(&t.id)
                .map(TagId::from)
                .unwrap_or_else(TagId::generate);
            let tag = Tag::new(id, t.name.unwrap_or_default(), fill_vector(slot, &mut computed)?);
            tag_items.push((tag, t.connections.unwrap_or_default()));
        }

        let mut post_items = Vec::with_capacity(posts.len());
        for (p, slot) in posts {
            let id = non_empty(&p.id)
                .map(PostId::from)
                .unwrap_or_else(PostId::generate);
            let vector = fill_vector(slot, &mut computed)?;
            let refs = p.tag_ids.or(p.tags).unwrap_or_default();
            post_items.push((
                id,
                p.title.unwrap_or_default(),
                p.content.unwrap_or_default(),
                vector,
                refs,
            ));
        }

        let relations: Vec<Relation> = seed
            .relations
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                let from = non_empty(&r.from)?.to_string();
                let to = non_empty(&r.to)?.to_string();
                let kind = normalize_relation_type(non_empty(&r.kind)?);
                Some(Relation {
                    id: Uuid::new_v4().to_string(),
                    from,
                    to,
                    kind,
                })
            })
            .collect();

        // Everything is embedded; apply under the write lock
        let mut graph = self.graph.write().await;
        let state: &mut KnowledgeGraph = &mut graph;

        report.keywords = keyword_items.len();
        state.keywords.extend(keyword_items);
        report.topics = topic_items.len();
        state.topics.extend(topic_items);

        let mut listed_edges = Vec::new();
        for (tag, connections) in tag_items {
            let id = tag.id.clone();
            if state.tags.insert(tag) {
                report.tags += 1;
                listed_edges.extend(connections.into_iter().map(|other| (id.clone(), other)));
            } else {
                warn!("Skipping seed tag {}: id already present", id);
            }
        }
        for (id, other) in listed_edges {
            if !state.tags.connect(&id, &TagId::from(other.as_str())) {
                debug!("Seed connection {} -> {} not added", id, other);
            }
        }

        for (id, title, content, vector, refs) in post_items {
            // An id and a name can point at the same tag
            let mut seen = HashSet::new();
            let tag_ids: Vec<TagId> = refs
                .iter()
                .filter_map(|r| resolve_tag(&state.tags, r))
                .filter(|tag_id| seen.insert(tag_id.clone()))
                .collect();
            let item = ContentItem {
                id: id.clone(),
                title,
                content,
                vector,
                tag_ids,
                created_at: Utc::now(),
            };
            if state.posts.insert(item) {
                report.posts += 1;
            } else {
                warn!("Skipping seed post {}: id already present", id);
            }
        }

        for relation in &relations {
            if relation.kind != TAGGED_WITH {
                continue;
            }
            for keyword in state.keywords.iter_mut().filter(|k| k.name == relation.to) {
                keyword.connections.insert(relation.from.clone());
            }
            let to = TagId::from(relation.to.as_str());
            let from = TagId::from(relation.from.as_str());
            if state.tags.contains(&to) && state.tags.contains(&from) {
                state.tags.connect(&to, &from);
            }
        }
        report.relations = relations.len();
        state.relations.extend(relations);

        info!(
            "Loaded {} topics, {} keywords, {} tags, {} posts and {} relations ({} embedded)",
            report.topics,
            report.keywords,
            report.tags,
            report.posts,
            report.relations,
            report.embedded
        );

        Ok(report)
    }

    /// Current graph in seed format, vectors included
    pub async fn export_seed(&self) -> SeedFile {
        let graph = self.graph.read().await;

        SeedFile {
            topics: Some(
                graph
                    .topics
                    .iter()
                    .map(|t| SeedTopic {
                        title: Some(t.title.clone()),
                        summary: Some(t.summary.clone()),
                        keywords: t.keywords.clone(),
                    })
                    .collect(),
            ),
            keywords: Some(
                graph
                    .keywords
                    .iter()
                    .map(|k| SeedKeyword {
                        name: Some(k.name.clone()),
                    })
                    .collect(),
            ),
            tags: Some(
                graph
                    .tags
                    .iter()
                    .map(|t| SeedTag {
                        id: Some(t.id.to_string()),
                        name: Some(t.name.clone()),
                        vector: Some(t.vector.clone()),
                        connections: Some(t.connections.iter().map(|c| c.to_string()).collect()),
                    })
                    .collect(),
            ),
            posts: Some(
                graph
                    .posts
                    .iter()
                    .map(|p| SeedPost {
                        id: Some(p.id.to_string()),
                        title: Some(p.title.clone()),
                        content: Some(p.content.clone()),
                        vector: Some(p.vector.clone()),
                        tag_ids: Some(p.tag_ids.iter().map(|t| t.to_string()).collect()),
                        tags: None,
                    })
                    .collect(),
            ),
            relations: Some(
                graph
                    .relations
                    .iter()
                    .map(|r| SeedRelation {
                        from: Some(r.from.clone()),
                        to: Some(r.to.clone()),
                        kind: Some(r.kind.clone()),
                    })
                    .collect(),
            ),
        }
    }
}
