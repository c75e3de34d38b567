use crate::config::Config;
use crate::error::{BurrowError, Result, ValidationError};

const PROVIDERS: &[&str] = &["fastembed", "gemini"];
const BACKENDS: &[&str] = &["memory", "qdrant", "none"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_vector_store(config, &mut errors);
        Self::validate_tagging(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BurrowError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let embedding = &config.embedding;

        if !PROVIDERS.contains(&embedding.provider.as_str()) {
            errors.push(ValidationError::new(
                "embedding.provider",
                format!(
                    "Unknown provider '{}', expected one of {:?}",
                    embedding.provider, PROVIDERS
                ),
            ));
        }

        if embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if embedding.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "embedding.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }
    }

    fn validate_vector_store(config: &Config, errors: &mut Vec<ValidationError>) {
        let store = &config.vector_store;

        if !BACKENDS.contains(&store.backend.as_str()) {
            errors.push(ValidationError::new(
                "vector_store.backend",
                format!(
                    "Unknown backend '{}', expected one of {:?}",
                    store.backend, BACKENDS
                ),
            ));
        }

        if store.collection.is_empty() {
            errors.push(ValidationError::new(
                "vector_store.collection",
                "Collection name cannot be empty",
            ));
        }

        if store.backend == "qdrant" && store.url.is_empty() {
            errors.push(ValidationError::new(
                "vector_store.url",
                "Qdrant URL cannot be empty",
            ));
        }

        if store.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "vector_store.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if store.hnsw_m == 0 || store.hnsw_ef_construction == 0 || store.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "vector_store.hnsw_*",
                "HNSW parameters must be greater than 0",
            ));
        }
    }

    fn validate_tagging(config: &Config, errors: &mut Vec<ValidationError>) {
        if !Self::is_similarity(config.tagging.attach_threshold) {
            errors.push(ValidationError::new(
                "tagging.attach_threshold",
                format!(
                    "Threshold must be within [-1, 1], got {}",
                    config.tagging.attach_threshold
                ),
            ));
        }

        if config.tagging.max_tags_per_item == 0 {
            errors.push(ValidationError::new(
                "tagging.max_tags_per_item",
                "Must attach at least one tag per item",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if !Self::is_similarity(config.retrieval.search_threshold) {
            errors.push(ValidationError::new(
                "retrieval.search_threshold",
                format!(
                    "Threshold must be within [-1, 1], got {}",
                    config.retrieval.search_threshold
                ),
            ));
        }

        if config.retrieval.max_result_tags == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_result_tags",
                "Must return at least one tag",
            ));
        }

        if config.retrieval.store_search_limit == 0 {
            errors.push(ValidationError::new(
                "retrieval.store_search_limit",
                "Limit must be greater than 0",
            ));
        }
    }

    fn is_similarity(value: f32) -> bool {
        (-1.0..=1.0).contains(&value)
    }
}
