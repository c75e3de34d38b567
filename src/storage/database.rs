//! SQLite database management with migrations
//!
//! Persists the knowledge graph between runs. Rows are only ever inserted or
//! replaced, never deleted, matching the engine's append-only graph.

use crate::error::{BurrowError, Result};
use crate::graph::{
    ContentItem, KnowledgeGraph, Keyword, PostId, Relation, Tag, TagId, Topic,
};
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Encode a vector as little-endian f32 bytes
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(BurrowError::Storage(format!(
            "Vector blob of {} bytes is not a whole number of f32s",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BurrowError::Storage(format!("Bad timestamp '{}': {}", raw, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| BurrowError::Json {
        source: e,
        context: "Failed to encode column".to_string(),
    })
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| BurrowError::Json {
        source: e,
        context: "Failed to decode column".to_string(),
    })
}

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) a database file
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BurrowError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| BurrowError::Storage(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.migrate()?;
        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| BurrowError::Storage(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);
                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Whether nothing has been stored yet
    pub fn is_empty(&self) -> Result<bool> {
        let conn = self.get_conn()?;
        let any: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM tags UNION ALL SELECT 1 FROM posts UNION ALL SELECT 1 FROM topics
                 UNION ALL SELECT 1 FROM keywords LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(any.is_none())
    }

    /// Upsert the whole graph in one transaction
    pub fn save_graph(&self, graph: &KnowledgeGraph) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for (position, tag) in graph.tags.iter().enumerate() {
            tx.execute(
                "INSERT INTO tags (id, name, vector, created_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, vector = excluded.vector",
                params![
                    tag.id.as_str(),
                    tag.name,
                    encode_vector(&tag.vector),
                    tag.created_at.to_rfc3339(),
                    position as i64
                ],
            )?;
        }
        // Both ends must exist before an edge row can reference them
        for tag in graph.tags.iter() {
            for other in &tag.connections {
                tx.execute(
                    "INSERT OR IGNORE INTO tag_connections (tag_id, other_id) VALUES (?1, ?2)",
                    params![tag.id.as_str(), other.as_str()],
                )?;
            }
        }

        for (position, post) in graph.posts.iter().enumerate() {
            tx.execute(
                "INSERT INTO posts (id, title, content, vector, created_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    post.id.as_str(),
                    post.title,
                    post.content,
                    encode_vector(&post.vector),
                    post.created_at.to_rfc3339(),
                    position as i64
                ],
            )?;
            for (ordinal, tag_id) in post.tag_ids.iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO post_tags (post_id, ordinal, tag_id) VALUES (?1, ?2, ?3)",
                    params![post.id.as_str(), ordinal as i64, tag_id.as_str()],
                )?;
            }
        }

        for (position, topic) in graph.topics.iter().enumerate() {
            tx.execute(
                "INSERT OR REPLACE INTO topics (id, title, summary, keywords, vector, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    topic.id,
                    topic.title,
                    topic.summary,
                    to_json(&topic.keywords)?,
                    encode_vector(&topic.vector),
                    position as i64
                ],
            )?;
        }

        for (position, keyword) in graph.keywords.iter().enumerate() {
            tx.execute(
                "INSERT OR REPLACE INTO keywords (id, name, vector, connections, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    keyword.id,
                    keyword.name,
                    encode_vector(&keyword.vector),
                    to_json(&keyword.connections)?,
                    position as i64
                ],
            )?;
        }

        for (position, relation) in graph.relations.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO relations (id, from_ref, to_ref, kind, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    relation.id,
                    relation.from,
                    relation.to,
                    relation.kind,
                    position as i64
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(
            "Saved {} tags and {} posts",
            graph.tags.len(),
            graph.posts.len()
        );
        Ok(())
    }

    /// Rebuild the graph in insertion order
    pub fn load_graph(&self) -> Result<KnowledgeGraph> {
        let conn = self.get_conn()?;
        let mut graph = KnowledgeGraph::new();

        for tag in Self::load_tags(&conn)? {
            graph.tags.insert(tag);
        }
        {
            let mut stmt = conn.prepare("SELECT tag_id, other_id FROM tag_connections")?;
            let edges = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for edge in edges {
                let (a, b) = edge?;
                graph.tags.connect(&TagId::from(a), &TagId::from(b));
            }
        }

        for post in Self::load_posts(&conn)? {
            graph.posts.insert(post);
        }

        graph.topics = Self::load_topics(&conn)?;
        graph.keywords = Self::load_keywords(&conn)?;
        graph.relations = Self::load_relations(&conn)?;

        Ok(graph)
    }

    fn load_tags(conn: &Connection) -> Result<Vec<Tag>> {
        let mut stmt =
            conn.prepare("SELECT id, name, vector, created_at FROM tags ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut tags = Vec::new();
        for row in rows {
            let (id, name, vector, created_at) = row?;
            tags.push(Tag {
                id: TagId::from(id),
                name,
                vector: decode_vector(&vector)?,
                connections: BTreeSet::new(),
                created_at: parse_time(&created_at)?,
            });
        }
        Ok(tags)
    }

    fn load_posts(conn: &Connection) -> Result<Vec<ContentItem>> {
        let mut tag_stmt =
            conn.prepare("SELECT tag_id FROM post_tags WHERE post_id = ?1 ORDER BY ordinal")?;
        let mut stmt = conn.prepare(
            "SELECT id, title, content, vector, created_at FROM posts ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut posts = Vec::new();
        for row in rows {
            let (id, title, content, vector, created_at) = row?;
            let tag_ids = tag_stmt
                .query_map(params![id], |r| r.get::<_, String>(0))?
                .map(|t| t.map(TagId::from))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            posts.push(ContentItem {
                id: PostId::from(id),
                title,
                content,
                vector: decode_vector(&vector)?,
                tag_ids,
                created_at: parse_time(&created_at)?,
            });
        }
        Ok(posts)
    }

    fn load_topics(conn: &Connection) -> Result<Vec<Topic>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, summary, keywords, vector FROM topics ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })?;

        let mut topics = Vec::new();
        for row in rows {
            let (id, title, summary, keywords, vector) = row?;
            topics.push(Topic {
                id,
                title,
                summary,
                keywords: from_json(&keywords)?,
                vector: decode_vector(&vector)?,
            });
        }
        Ok(topics)
    }

    fn load_keywords(conn: &Connection) -> Result<Vec<Keyword>> {
        let mut stmt = conn
            .prepare("SELECT id, name, vector, connections FROM keywords ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut keywords = Vec::new();
        for row in rows {
            let (id, name, vector, connections) = row?;
            keywords.push(Keyword {
                id,
                name,
                vector: decode_vector(&vector)?,
                connections: from_json(&connections)?,
            });
        }
        Ok(keywords)
    }

    fn load_relations(conn: &Connection) -> Result<Vec<Relation>> {
        let mut stmt =
            conn.prepare("SELECT id, from_ref, to_ref, kind FROM relations ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok(Relation {
                id: row.get(0)?,
                from: row.get(1)?,
                to: row.get(2)?,
                kind: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };

        Ok(DbStats {
            tag_count: count("tags")?,
            post_count: count("posts")?,
            edge_count: count("tag_connections")? / 2,
            relation_count: count("relations")?,
        })
    }
}

/// Database statistics
#[derive(Debug)]
pub struct DbStats {
    pub tag_count: usize,
    pub post_count: usize,
    pub edge_count: usize,
    pub relation_count: usize,
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE tags (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        vector BLOB NOT NULL,
        created_at TEXT NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE INDEX idx_tags_position ON tags(position);

    -- Stored in both directions
    CREATE TABLE tag_connections (
        tag_id TEXT NOT NULL,
        other_id TEXT NOT NULL,
        PRIMARY KEY (tag_id, other_id),
        FOREIGN KEY (tag_id) REFERENCES tags(id),
        FOREIGN KEY (other_id) REFERENCES tags(id)
    );

    CREATE TABLE posts (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        vector BLOB NOT NULL,
        created_at TEXT NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE INDEX idx_posts_position ON posts(position);

    CREATE TABLE post_tags (
        post_id TEXT NOT NULL,
        ordinal INTEGER NOT NULL,
        tag_id TEXT NOT NULL,
        PRIMARY KEY (post_id, ordinal),
        FOREIGN KEY (post_id) REFERENCES posts(id),
        FOREIGN KEY (tag_id) REFERENCES tags(id)
    );

    CREATE INDEX idx_post_tags_tag ON post_tags(tag_id);

    CREATE TABLE topics (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        summary TEXT NOT NULL,
        keywords TEXT NOT NULL,
        vector BLOB NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE TABLE keywords (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        vector BLOB NOT NULL,
        connections TEXT NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE TABLE relations (
        id TEXT PRIMARY KEY,
        from_ref TEXT NOT NULL,
        to_ref TEXT NOT NULL,
        kind TEXT NOT NULL,
        position INTEGER NOT NULL
    );
    "#,
];
