//! Remote embedding provider backed by the Gemini `embedContent` endpoint

use super::{EmbeddingError, EmbeddingProvider};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Gemini API base URL
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini embedding model
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-embedding-001";

/// Output size of `gemini-embedding-001`
pub const GEMINI_DEFAULT_DIMENSION: usize = 3072;

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Gemini embedding client
#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    model_name: String,
    dimension: usize,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a client for `model_name` producing `dimension`-sized vectors
    pub fn new(
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(EmbeddingError::InitializationError(
                "Gemini API key is required".to_string(),
            ));
        }

        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::InitializationError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model_name: model_name.into(),
            dimension,
        })
    }

    /// Read the API key from an environment variable
    pub fn from_env(
        api_key_env: &str,
        model_name: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(api_key_env).map_err(|_| {
            EmbeddingError::InitializationError(format!(
                "Environment variable {} is not set",
                api_key_env
            ))
        })?;
        Self::new(api_key, model_name, dimension, timeout)
    }

    /// Override the base URL (proxies, tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/models/{}:embedContent", self.base_url, self.model_name);
        let body = EmbedContentRequest {
            model: format!("models/{}", self.model_name),
            content: Content {
                parts: [Part { text }],
            },
        };

        debug!("Requesting Gemini embedding ({} chars)", text.len());

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited(status.to_string()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestError(format!("{}: {}", status, detail)));
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let values = parsed.embedding.values;
        if values.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: values.len(),
            });
        }

        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
