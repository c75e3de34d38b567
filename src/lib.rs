//! Burrow - semantic tagging and retrieval for forum posts
//!
//! Posts are embedded and attached to the tags they are most similar to; a post
//! that matches nothing mints a tag of its own. Tags attached to the same post
//! are linked in an undirected co-occurrence graph. Queries are answered by
//! ranking tags against the query embedding and returning the posts on the
//! winning tags.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod graph;
pub mod seed;
pub mod storage;
pub mod vector;

pub use engine::{Engine, EngineSettings, SearchResults};
pub use error::{BurrowError, Result};
