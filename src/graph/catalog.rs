//! Topics, keywords and raw relations carried over from seed snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Relation type that links keywords and tags
pub const TAGGED_WITH: &str = "TAGGED_WITH";

/// Upper-case a relation type and replace anything outside `A-Z_` with `_`
pub fn normalize_relation_type(kind: &str) -> String {
    kind.to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_uppercase() || c == '_' { c } else { '_' })
        .collect()
}

/// Summary node from a scraped feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub keywords: Vec<String>,
    pub vector: Vec<f32>,
}

/// Keyword node; connections hold the raw `from` refs of TAGGED_WITH relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub name: String,
    pub vector: Vec<f32>,
    pub connections: BTreeSet<String>,
}

/// A typed edge between two arbitrary node references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
}
