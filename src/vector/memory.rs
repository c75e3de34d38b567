/// In-process HNSW vector store
use super::{Distance, Payload, ScoredPoint, VectorStore, VectorStoreError};
use crate::graph::magnitude;
use async_trait::async_trait;
use hnsw_rs::prelude::*;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Upper bound on HNSW layers
const MAX_LAYERS: usize = 16;

/// Initial capacity hint for a collection
const INITIAL_CAPACITY: usize = 10_000;

/// One stored point. HNSW cannot delete, so a replaced point leaves a
/// tombstone (`None`) in its slot.
struct Slot {
    id: String,
    payload: Payload,
}

struct Collection {
    index: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    slots: Vec<Option<Slot>>,
    by_id: HashMap<String, usize>,
}

impl Collection {
    fn live(&self) -> usize {
        self.by_id.len()
    }

    fn tombstones(&self) -> usize {
        self.slots.len() - self.live()
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorStoreError> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// HNSW-backed store, one graph per collection
///
/// Provides approximate nearest neighbour search with cosine distance.
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
}

impl MemoryVectorStore {
    /// # Arguments
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `ef_search` - HNSW search parameter (higher = better recall, slower search)
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            m,
            ef_construction,
            ef_search,
        }
    }

    /// Number of live points in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Collection::live)
            .unwrap_or(0)
    }

    /// Payload stored for an id
    pub async fn payload(&self, collection: &str, id: &str) -> Option<Payload> {
        let collections = self.collections.read().await;
        let coll = collections.get(collection)?;
        let slot = *coll.by_id.get(id)?;
        coll.slots[slot].as_ref().map(|s| s.payload.clone())
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new(16, 200, 64)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        distance: Distance,
    ) -> Result<(), VectorStoreError> {
        if distance != Distance::Cosine {
            return Err(VectorStoreError::UnsupportedDistance(distance));
        }

        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(name) {
            if existing.dimension != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: existing.dimension,
                    actual: dimension,
                });
            }
            return Ok(());
        }

        let index = Hnsw::<f32, DistCosine>::new(
            self.m,
            INITIAL_CAPACITY,
            MAX_LAYERS,
            self.ef_construction,
            DistCosine,
        );

        collections.insert(
            name.to_string(),
            Collection {
                index,
                dimension,
                slots: Vec::new(),
                by_id: HashMap::new(),
            },
        );
        tracing::info!("Created collection {} ({}D, cosine)", name, dimension);
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        payload: Payload,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        coll.check_dimension(vector)?;
        if magnitude(vector) == 0.0 {
            return Err(VectorStoreError::InvalidVector(
                "zero vector has no cosine direction".to_string(),
            ));
        }

        if let Some(old) = coll.by_id.get(id).copied() {
            coll.slots[old] = None;
        }

        let slot = coll.slots.len();
        coll.index.insert_slice((vector, slot));
        coll.slots.push(Some(Slot {
            id: id.to_string(),
            payload,
        }));
        coll.by_id.insert(id.to_string(), slot);

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;

        coll.check_dimension(vector)?;
        if limit == 0 || coll.live() == 0 || magnitude(vector) == 0.0 {
            return Ok(Vec::new());
        }

        // Over-fetch so tombstoned neighbours do not eat into the limit
        let k = (limit + coll.tombstones()).min(coll.slots.len());
        let ef = self.ef_search.max(k);

        let mut hits: Vec<ScoredPoint> = coll
            .index
            .search(vector, k, ef)
            .into_iter()
            .filter_map(|neighbour| {
                coll.slots
                    .get(neighbour.d_id)
                    .and_then(Option::as_ref)
                    .map(|slot| ScoredPoint {
                        id: slot.id.clone(),
                        score: 1.0 - neighbour.distance,
                        payload: slot.payload.clone(),
                    })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
