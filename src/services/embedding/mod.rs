//! Text embedding: the model seam and the batching front end.

mod lazy;
mod onnx;

pub use lazy::LazyEmbeddingModel;
pub use onnx::OnnxEmbeddingModel;

use std::sync::Arc;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// A sentence-embedding model.
///
/// Implementations must be pure functions of each input text: the vector for a
/// text may not depend on the other texts in the same call. Rows need not be
/// unit length; [`Embedder`] normalizes them.
pub trait EmbeddingModel: Send + Sync {
    /// One vector of width [`EmbeddingModel::dimension`] per input, in order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

pub type SharedEmbeddingModel = Arc<dyn EmbeddingModel>;

/// Batches texts through a shared [`EmbeddingModel`].
#[derive(Clone)]
pub struct Embedder {
    model: SharedEmbeddingModel,
    batch_size: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.model.model_id())
            .field("dimension", &self.model.dimension())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Embedder {
    pub fn new(model: SharedEmbeddingModel, batch_size: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_default_batch_size(model: SharedEmbeddingModel) -> Self {
        Self::new(model, DEFAULT_BATCH_SIZE)
    }

    /// An embedder over the configured ONNX model, loaded on first use.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let model: SharedEmbeddingModel = Arc::new(LazyEmbeddingModel::new(config.clone()));
        Self::new(model, config.batch_size as usize)
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed texts, one L2-normalized row per input.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_with_progress(texts, |_, _| {})
    }

    /// Embed a single text, e.g. a query.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut rows = self.embed(&[text.to_string()])?;
        rows.pop().ok_or_else(|| {
            EmbeddingError::Inference("model returned no vector for the query".to_string())
        })
    }

    /// Embed texts, reporting `(done, total)` after every batch.
    pub fn embed_with_progress<F>(
        &self,
        texts: &[String],
        mut on_batch: F,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError>
    where
        F: FnMut(usize, usize),
    {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = self.model.dimension();
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.model.embed(batch)?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::Inference(format!(
                    "model returned {} vectors for {} inputs",
                    embeddings.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = embeddings.iter().find(|v| v.len() != expected) {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
            all_embeddings.extend(embeddings.iter().map(|v| normalize(v)));
            on_batch(all_embeddings.len(), texts.len());
        }

        Ok(all_embeddings)
    }
}

/// Scale `v` to unit length; zero vectors are returned unchanged.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
