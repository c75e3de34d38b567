//! Deterministic embedders shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use burrow::embedding::{EmbeddingError, EmbeddingProvider};
use burrow::engine::{Engine, EngineSettings};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CATS: (&str, &str) = ("Cats", "Cats are great pets");
pub const CUTE: (&str, &str) = ("Cats are cute", "I love cats");
pub const ROCKETS: (&str, &str) = ("Rocket science", "Orbital mechanics is hard");

/// Maps known texts to fixed 3-d vectors; anything else is an error
pub struct StubEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
    batches: Mutex<Vec<usize>>,
}

impl StubEmbedder {
    pub fn new() -> Self {
        let mut stub = Self {
            vectors: HashMap::new(),
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        };
        stub.insert("Cats Cats are great pets", [1.0, 0.0, 0.0]);
        stub.insert("cats", [1.0, 0.0, 0.0]);
        // cos 0.9 to the cats vector
        stub.insert("Cats are cute I love cats", [0.9, 0.435_889_9, 0.0]);
        // cos 0.1 to the cats vector
        stub.insert("Rocket science Orbital mechanics is hard", [0.1, 0.0, 0.994_987_4]);
        stub.insert("rocket science", [0.1, 0.0, 0.994_987_4]);
        // cos 0.5 to cats, ~0.05 to rockets
        stub.insert("pets?", [0.5, 0.866_025_4, 0.0]);
        stub
    }

    pub fn with(mut self, text: &str, vector: [f32; 3]) -> Self {
        self.insert(text, vector);
        self
    }

    fn insert(&mut self, text: &str, vector: [f32; 3]) {
        self.vectors.insert(text.to_string(), vector.to_vec());
    }

    /// Texts embedded so far, singly or in batches
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Size of every `embed_batch` call, in order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    fn lookup(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::GenerationError(format!("no stub vector for '{}'", text)))
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lookup(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.batches.lock().unwrap().push(texts.len());
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        texts.iter().map(|t| self.lookup(t)).collect()
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Always fails, like an unreachable remote provider
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::RequestError("connection refused".to_string()))
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Never answers within any reasonable timeout
pub struct SlowEmbedder;

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

pub fn stub_engine() -> Engine {
    Engine::new(Arc::new(StubEmbedder::new()), EngineSettings::default())
}

pub fn engine_with(embedder: impl EmbeddingProvider + 'static, settings: EngineSettings) -> Engine {
    Engine::new(Arc::new(embedder), settings)
}
