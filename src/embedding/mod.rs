/// Embedding providers
///
/// Text in, fixed-length vector out. The rest of the crate only sees the
/// `EmbeddingProvider` trait:
/// - FastEmbedProvider for local embedding (all-MiniLM-L6-v2, 384-dim)
/// - GeminiProvider for the hosted `gemini-embedding-001` model (3072-dim)
/// - CachedEmbedder to skip repeat calls for identical text
mod cache;
mod gemini;
mod provider;

pub use cache::CachedEmbedder;
pub use gemini::{GeminiProvider, GEMINI_DEFAULT_DIMENSION, GEMINI_DEFAULT_MODEL};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};

use crate::config::EmbeddingConfig;
use crate::error::{BurrowError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Build the provider named in the configuration, wrapped in a cache when
/// `cache_capacity` is non-zero
pub fn provider_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let base: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        "fastembed" => Arc::new(FastEmbedProvider::new(&config.model)?),
        "gemini" => Arc::new(GeminiProvider::from_env(
            &config.api_key_env,
            config.model.clone(),
            config.dimension,
            Duration::from_secs(config.timeout_secs),
        )?),
        other => {
            return Err(BurrowError::Config(format!(
                "Unknown embedding provider: {}",
                other
            )))
        }
    };

    if base.dimension() != config.dimension {
        return Err(BurrowError::InvalidConfigValue {
            path: "embedding.dimension".to_string(),
            message: format!(
                "Model {} produces {} dimensions, config says {}",
                base.model_name(),
                base.dimension(),
                config.dimension
            ),
        });
    }

    if config.cache_capacity == 0 {
        return Ok(base);
    }
    Ok(Arc::new(CachedEmbedder::new(base, config.cache_capacity)))
}
