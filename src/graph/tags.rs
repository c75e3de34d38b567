//! Tag graph: semantic clusters connected by co-occurrence edges
//!
//! Tags are kept in insertion order so that equal similarity scores resolve to
//! the earliest tag. Edges are undirected and stored on both endpoints.

use ahash::{HashMap, HashMapExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Identifier of a tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TagId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TagId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A semantic cluster with a frozen representative vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    /// Display label, not necessarily unique
    pub name: String,
    /// Set once from the item that spawned the tag
    pub vector: Vec<f32>,
    /// Tags this tag co-occurs with
    pub connections: BTreeSet<TagId>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id,
            name: name.into(),
            vector,
            connections: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// All tags plus their co-occurrence edges
#[derive(Debug, Clone, Default)]
pub struct TagGraph {
    tags: Vec<Tag>,
    positions: HashMap<TagId, usize>,
}

impl TagGraph {
    pub fn new() -> Self {
        Self {
            tags: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, id: &TagId) -> Option<&Tag> {
        self.positions.get(id).map(|&pos| &self.tags[pos])
    }

    pub fn contains(&self, id: &TagId) -> bool {
        self.positions.contains_key(id)
    }

    /// Tags in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Tag at an insertion position
    pub fn at(&self, pos: usize) -> Option<&Tag> {
        self.tags.get(pos)
    }

    /// Insert a tag, ignoring any connections it carries.
    ///
    /// Returns false (and leaves the graph untouched) when the id is taken.
    /// Edges must go through [`TagGraph::connect`] to stay symmetric.
    pub fn insert(&mut self, mut tag: Tag) -> bool {
        if self.positions.contains_key(&tag.id) {
            return false;
        }
        tag.connections.clear();
        self.positions.insert(tag.id.clone(), self.tags.len());
        self.tags.push(tag);
        true
    }

    /// Create a new tag with a fresh id and return that id
    pub fn mint(&mut self, name: impl Into<String>, vector: Vec<f32>) -> TagId {
        let id = TagId::generate();
        self.insert(Tag::new(id.clone(), name, vector));
        id
    }

    /// Add an undirected edge between two tags.
    ///
    /// Self-loops and unknown ids are ignored. Returns true when the edge was
    /// not present before; connecting an existing pair is a no-op.
    pub fn connect(&mut self, a: &TagId, b: &TagId) -> bool {
        if a == b {
            return false;
        }
        let (Some(&pos_a), Some(&pos_b)) = (self.positions.get(a), self.positions.get(b)) else {
            return false;
        };

        let added_a = self.tags[pos_a].connections.insert(b.clone());
        let added_b = self.tags[pos_b].connections.insert(a.clone());
        added_a || added_b
    }

    /// Co-occurrence neighbours of a tag
    pub fn neighbours(&self, id: &TagId) -> Vec<&Tag> {
        self.get(id)
            .map(|tag| {
                tag.connections
                    .iter()
                    .filter_map(|other| self.get(other))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First tag whose name matches case-insensitively
    pub fn find_by_name(&self, name: &str) -> Option<&Tag> {
        let wanted = name.to_lowercase();
        self.tags.iter().find(|t| t.name.to_lowercase() == wanted)
    }

    /// Each undirected edge once, as (smaller id, larger id)
    pub fn edges(&self) -> Vec<(&TagId, &TagId)> {
        self.tags
            .iter()
            .flat_map(|tag| {
                tag.connections
                    .iter()
                    .filter(move |other| tag.id < **other)
                    .map(move |other| (&tag.id, other))
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    /// Check symmetry, absence of self-loops and dangling edges
    pub fn is_consistent(&self) -> bool {
        self.tags.iter().all(|tag| {
            tag.connections.iter().all(|other| {
                other != &tag.id
                    && self
                        .get(other)
                        .is_some_and(|o| o.connections.contains(&tag.id))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(names: &[&str]) -> (TagGraph, Vec<TagId>) {
        let mut graph = TagGraph::new();
        let ids = names
            .iter()
            .map(|n| graph.mint(*n, vec![1.0, 0.0]))
            .collect();
        (graph, ids)
    }

    #[test]
    fn test_connect_is_symmetric() {
        let (mut graph, ids) = graph_with(&["a", "b"]);
        assert!(graph.connect(&ids[0], &ids[1]));

        assert!(graph.get(&ids[0]).unwrap().connections.contains(&ids[1]));
        assert!(graph.get(&ids[1]).unwrap().connections.contains(&ids[0]));
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_connect_twice_is_noop() {
        let (mut graph, ids) = graph_with(&["a", "b"]);
        graph.connect(&ids[0], &ids[1]);
        assert!(!graph.connect(&ids[1], &ids[0]));
        assert_eq!(graph.get(&ids[0]).unwrap().connections.len(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_no_self_loop() {
        let (mut graph, ids) = graph_with(&["a"]);
        assert!(!graph.connect(&ids[0], &ids[0]));
        assert!(graph.get(&ids[0]).unwrap().connections.is_empty());
    }

    #[test]
    fn test_unknown_endpoint_ignored() {
        let (mut graph, ids) = graph_with(&["a"]);
        assert!(!graph.connect(&ids[0], &TagId::from("missing")));
        assert!(graph.get(&ids[0]).unwrap().connections.is_empty());
    }

    #[test]
    fn test_insert_drops_carried_connections() {
        let mut graph = TagGraph::new();
        let mut tag = Tag::new(TagId::from("t1"), "one", vec![1.0]);
        tag.connections.insert(TagId::from("t2"));
        assert!(graph.insert(tag));
        assert!(graph.is_consistent());
        assert!(!graph.insert(Tag::new(TagId::from("t1"), "dup", vec![0.5])));
        assert_eq!(graph.get(&TagId::from("t1")).unwrap().name, "one");
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let (graph, ids) = graph_with(&["Rust", "cats"]);
        assert_eq!(graph.find_by_name("rust").unwrap().id, ids[0]);
        assert_eq!(graph.find_by_name("CATS").unwrap().id, ids[1]);
        assert!(graph.find_by_name("dogs").is_none());
    }

    #[test]
    fn test_neighbours_and_insertion_order() {
        let (mut graph, ids) = graph_with(&["a", "b", "c"]);
        graph.connect(&ids[0], &ids[2]);

        let names: Vec<&str> = graph.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let neighbours = graph.neighbours(&ids[2]);
        assert_eq!(neighbours.len(), 1);
        assert_eq!(neighbours[0].id, ids[0]);
    }
}
