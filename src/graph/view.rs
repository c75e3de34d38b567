//! Node/link projection of the tag graph for force-graph front-ends

use super::TagGraph;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: &'static str,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub label: &'static str,
}

/// `{ nodes, links }` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphView {
    /// Project up to `limit` edges and the tags they touch.
    ///
    /// Isolated tags are included while room is left under `limit` nodes.
    pub fn from_tags(graph: &TagGraph, limit: usize) -> Self {
        let mut view = GraphView::default();
        let mut seen = HashSet::new();

        for (a, b) in graph.edges().into_iter().take(limit) {
            for id in [a, b] {
                if seen.insert(id.clone()) {
                    if let Some(tag) = graph.get(id) {
                        view.nodes.push(GraphNode {
                            id: tag.id.to_string(),
                            label: "Tag",
                            name: tag.name.clone(),
                        });
                    }
                }
            }
            view.links.push(GraphLink {
                source: a.to_string(),
                target: b.to_string(),
                label: "CO_OCCURS",
            });
        }

        for tag in graph.iter() {
            if view.nodes.len() >= limit {
                break;
            }
            if tag.connections.is_empty() && seen.insert(tag.id.clone()) {
                view.nodes.push(GraphNode {
                    id: tag.id.to_string(),
                    label: "Tag",
                    name: tag.name.clone(),
                });
            }
        }

        view
    }
}
