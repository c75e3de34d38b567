//! Content-addressed embedding cache
//!
//! Wraps another provider and remembers vectors by the blake3 hash of the
//! input text, evicting the oldest entry once `capacity` is reached.

use super::{EmbeddingError, EmbeddingProvider};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct CacheEntries {
    vectors: HashMap<blake3::Hash, Vec<f32>>,
    order: VecDeque<blake3::Hash>,
}

/// Caching decorator around an [`EmbeddingProvider`]
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    entries: Mutex<CacheEntries>,
    capacity: usize,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        Self {
            inner,
            entries: Mutex::new(CacheEntries::default()),
            capacity,
        }
    }

    /// Number of cached vectors
    pub async fn len(&self) -> usize {
        self.entries.lock().await.vectors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn remember(&self, key: blake3::Hash, vector: Vec<f32>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().await;
        if entries.vectors.insert(key, vector).is_none() {
            entries.order.push_back(key);
        }
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.vectors.remove(&oldest);
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = blake3::hash(text.as_bytes());

        if let Some(hit) = self.entries.lock().await.vectors.get(&key) {
            debug!("Embedding cache hit");
            return Ok(hit.clone());
        }

        let vector = self.inner.embed(text).await?;
        self.remember(key, vector.clone()).await;
        Ok(vector)
    }

    /// Serve hits from the cache and send only the misses on as one batch
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let keys: Vec<blake3::Hash> = texts.iter().map(|t| blake3::hash(t.as_bytes())).collect();

        let mut out: Vec<Option<Vec<f32>>> = {
            let entries = self.entries.lock().await;
            keys.iter().map(|k| entries.vectors.get(k).cloned()).collect()
        };

        let missing: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed_batch(&batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::GenerationError(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            for (&i, vector) in missing.iter().zip(vectors) {
                self.remember(keys[i], vector.clone()).await;
                out[i] = Some(vector);
            }
        }
        debug!(
            "Embedding batch: {} cached, {} computed",
            texts.len() - missing.len(),
            missing.len()
        );

        Ok(out.into_iter().flatten().collect())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn counting() -> Arc<CountingProvider> {
        Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_repeated_text_hits_cache() {
        let inner = counting();
        let cache = CachedEmbedder::new(inner.clone(), 8);

        let first = cache.embed("cats").await.unwrap();
        let second = cache.embed("cats").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.dimension(), 2);
    }

    #[tokio::test]
    async fn test_evicts_oldest() {
        let inner = counting();
        let cache = CachedEmbedder::new(inner.clone(), 2);

        cache.embed("a").await.unwrap();
        cache.embed("bb").await.unwrap();
        cache.embed("ccc").await.unwrap();
        assert_eq!(cache.len().await, 2);

        cache.embed("a").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_capacity_disables() {
        let inner = counting();
        let cache = CachedEmbedder::new(inner.clone(), 0);

        cache.embed("a").await.unwrap();
        cache.embed("a").await.unwrap();
        assert!(cache.is_empty().await);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_computes_only_misses() {
        let inner = counting();
        let cache = CachedEmbedder::new(inner.clone(), 8);
        cache.embed("a").await.unwrap();

        let texts = vec!["bb".to_string(), "a".to_string(), "cccc".to_string()];
        let vectors = cache.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors, vec![vec![2.0, 1.0], vec![1.0, 1.0], vec![4.0, 1.0]]);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.len().await, 3);
    }
}
