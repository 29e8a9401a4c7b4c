//! Deterministic stand-ins for the embedding model.

use std::sync::Arc;

use crate::error::EmbeddingError;
use crate::services::embedding::{Embedder, EmbeddingModel, normalize};
use crate::utils::tokenize;

/// Bag-of-tokens embedding: each token bumps one FNV-hashed bucket, then the
/// vector is L2-normalized. Texts sharing tokens land close together.
pub struct HashingModel {
    dimension: usize,
}

impl HashingModel {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            v[fnv1a(token.as_bytes()) as usize % self.dimension] += 1.0;
        }
        normalize(&v)
    }
}

impl EmbeddingModel for HashingModel {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "test/hashing"
    }
}

/// A model whose weights never load.
pub struct FailingModel;

impl EmbeddingModel for FailingModel {
    fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::ModelUnavailable(
            "no network and no cached weights".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        8
    }

    fn model_id(&self) -> &str {
        "test/failing"
    }
}

pub fn hashing_embedder(dimension: usize) -> Embedder {
    Embedder::new(Arc::new(HashingModel::new(dimension)), 4)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
