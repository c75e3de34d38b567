//! Qdrant REST backend

use super::{Distance, Payload, ScoredPoint, VectorStore, VectorStoreError};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Payload key holding the caller's own point id
const ID_KEY: &str = "id";

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Deserialize)]
struct CollectionParams {
    vectors: VectorParams,
}

#[derive(Deserialize)]
struct VectorParams {
    size: usize,
}

#[derive(Deserialize)]
struct Hit {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Option<Payload>,
}

/// Qdrant accepts only UUIDs or unsigned integers as point ids. Anything
/// else is mapped onto a UUID built from its blake3 hash.
pub fn point_id(id: &str) -> String {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return uuid.to_string();
    }
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        return id.to_string();
    }
    let hash = blake3::hash(id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    Uuid::from_bytes(bytes).to_string()
}

fn distance_name(distance: Distance) -> &'static str {
    match distance {
        Distance::Cosine => "Cosine",
        Distance::Dot => "Dot",
        Distance::Euclid => "Euclid",
    }
}

/// Client for a Qdrant instance
pub struct QdrantStore {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, VectorStoreError> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VectorStoreError::RequestError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, VectorStoreError> {
        self.authorized(request).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                VectorStoreError::Unreachable(e.to_string())
            } else {
                VectorStoreError::RequestError(e.to_string())
            }
        })
    }

    async fn expect_success(response: Response) -> Result<Response, VectorStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        Err(VectorStoreError::RequestError(format!("{}: {}", status, detail)))
    }

    async fn collection_dimension(&self, name: &str) -> Result<Option<usize>, VectorStoreError> {
        let url = format!("{}/collections/{}", self.base_url, name);
        let response = self.send(self.http_client.get(&url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let info: QdrantResponse<CollectionInfo> = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|e| VectorStoreError::RequestError(e.to_string()))?;
        Ok(Some(info.result.config.params.vectors.size))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        if let Some(existing) = self.collection_dimension(name).await? {
            if existing != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: existing,
                    actual: dimension,
                });
            }
            debug!("Collection {} already exists", name);
            return Ok(());
        }

        let url = format!("{}/collections/{}", self.base_url, name);
        let body = json!({
            "vectors": { "size": dimension, "distance": distance_name(distance) }
        });
        let response = self.send(self.http_client.put(&url).json(&body)).await?;
        Self::expect_success(response).await?;

        info!("Created Qdrant collection {} ({}D)", name, dimension);
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        mut payload: Payload,
    ) -> Result<(), VectorStoreError> {
        payload.insert(ID_KEY.to_string(), Value::String(id.to_string()));

        let url = format!("{}/collections/{}/points?wait=true", self.base_url, collection);
        let point = point_id(id);
        let point = match point.parse::<u64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(point),
        };
        let body = json!({
            "points": [{ "id": point, "vector": vector, "payload": payload }]
        });
        let response = self.send(self.http_client.put(&url).json(&body)).await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let url = format!("{}/collections/{}/points/search", self.base_url, collection);
        let body = json!({ "vector": vector, "limit": limit, "with_payload": true });
        let response = self.send(self.http_client.post(&url).json(&body)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(VectorStoreError::CollectionNotFound(collection.to_string()));
        }

        let parsed: QdrantResponse<Vec<Hit>> = Self::expect_success(response)
            .await?
            .json()
            .await
            .map_err(|e| VectorStoreError::RequestError(e.to_string()))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|hit| {
                let payload = hit.payload.unwrap_or_default();
                let id = match payload.get(ID_KEY) {
                    Some(Value::String(s)) => s.clone(),
                    _ => match hit.id {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                };
                ScoredPoint {
                    id,
                    score: hit.score,
                    payload,
                }
            })
            .collect())
    }

    fn backend_name(&self) -> &str {
        "qdrant"
    }
}
