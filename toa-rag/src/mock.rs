//! Deterministic offline providers.
//!
//! [`HashEmbeddingProvider`] builds embeddings from hashed word counts, so
//! an index built with it can be queried without any API key.
//! [`MockGenerator`] answers from a closure and records every request.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::TextGenerator;

/// Deterministic hashed bag-of-words embeddings.
///
/// Every lowercase alphanumeric token is hashed to a signed bucket; the
/// vector is L2-normalised, so texts sharing vocabulary score high under
/// cosine similarity and texts with disjoint vocabulary score near zero.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
    model: String,
}

impl HashEmbeddingProvider {
    /// Create a provider producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self { dimensions, model: format!("hash-{dimensions}") }
    }

    /// Override the model identifier reported to the index.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
        {
            let hash = token
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// One recorded call to a [`MockGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationCall {
    /// The instruction passed to the generator.
    pub prompt: String,
    /// The grounding context passed to the generator.
    pub context: String,
}

type Responder = dyn Fn(&str, &str) -> Result<String> + Send + Sync;

/// A [`TextGenerator`] that answers from a closure.
pub struct MockGenerator {
    responder: Box<Responder>,
    calls: Arc<Mutex<Vec<GenerationCall>>>,
}

impl MockGenerator {
    /// Answer every request with the closure's result.
    pub fn new(responder: impl Fn(&str, &str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self { responder: Box::new(responder), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Answer every request with the same text.
    pub fn replying(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_, _| Ok(reply.clone()))
    }

    /// Fail every request.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_, _| Err(RagError::SynthesisFailed(message.clone())))
    }

    /// All requests received so far.
    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, context: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(GenerationCall { prompt: prompt.to_string(), context: context.to_string() });
        (self.responder)(prompt, context)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
