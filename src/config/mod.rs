//! Configuration management for Burrow
//!
//! Loads the TOML config, applies `BURROW_SECTION__KEY` environment overrides
//! and validates the result. Every section has defaults, so a partial file
//! is enough.

use crate::error::{BurrowError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub tagging: TaggingConfig,
    pub retrieval: RetrievalConfig,
    pub seed: SeedConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: "1.0.0".to_string(),
            created_at: current_timestamp(),
            last_modified: current_timestamp(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.burrow"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// "fastembed" (local) or "gemini" (remote)
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    /// Environment variable holding the remote provider's API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Cached vectors kept in memory; 0 disables the cache
    pub cache_capacity: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "fastembed".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 10,
            cache_capacity: 1024,
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// "memory", "qdrant" or "none"
    pub backend: String,
    pub url: String,
    pub api_key_env: String,
    pub collection: String,
    pub timeout_secs: u64,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
    /// Push each ingested post to the store right away
    pub sync_on_ingest: bool,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            url: "http://localhost:6333".to_string(),
            api_key_env: "QDRANT_API_KEY".to_string(),
            collection: "burrow_embeddings".to_string(),
            timeout_secs: 5,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 64,
            sync_on_ingest: false,
        }
    }
}

/// Tag attachment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    pub attach_threshold: f32,
    pub max_tags_per_item: usize,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            attach_threshold: 0.85,
            max_tags_per_item: 5,
        }
    }
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub search_threshold: f32,
    pub max_result_tags: usize,
    /// Default number of hits for vector store search
    pub store_search_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_threshold: 0.80,
            max_result_tags: 5,
            store_search_limit: 8,
        }
    }
}

/// Seed snapshot loaded into an empty database at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BurrowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BurrowError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;

        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Parse configuration text without touching the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BurrowError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| BurrowError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: BURROW_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("BURROW_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__PROVIDER" => self.embedding.provider = value.to_string(),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__DIMENSION" => {
                self.embedding.dimension = parse_env(path, value)?;
            }
            "VECTOR_STORE__BACKEND" => self.vector_store.backend = value.to_string(),
            "VECTOR_STORE__URL" => self.vector_store.url = value.to_string(),
            "VECTOR_STORE__COLLECTION" => self.vector_store.collection = value.to_string(),
            "TAGGING__ATTACH_THRESHOLD" => {
                self.tagging.attach_threshold = parse_env(path, value)?;
            }
            "RETRIEVAL__SEARCH_THRESHOLD" => {
                self.retrieval.search_threshold = parse_env(path, value)?;
            }
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| BurrowError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("burrow").join("config.toml"))
    }

    /// SQLite database location inside the data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(expand_path(&self.storage.data_dir)?.join("burrow.sqlite"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| BurrowError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| BurrowError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| BurrowError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
