use once_cell::sync::OnceCell;

use super::{EmbeddingModel, OnnxEmbeddingModel};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Defers loading the ONNX model until the first embedding call.
///
/// Dimension and model id come from configuration, so they are available
/// before anything is loaded. A failed load is not cached; the next call
/// retries.
pub struct LazyEmbeddingModel {
    config: EmbeddingConfig,
    model: OnceCell<OnnxEmbeddingModel>,
}

impl LazyEmbeddingModel {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    fn get(&self) -> Result<&OnnxEmbeddingModel, EmbeddingError> {
        self.model.get_or_try_init(|| {
            tracing::debug!(model = %self.config.model_id, "loading embedding model");
            OnnxEmbeddingModel::load(&self.config)
        })
    }
}

impl EmbeddingModel for LazyEmbeddingModel {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.get()?.embed(texts)
    }

    fn dimension(&self) -> usize {
        self.config.dimension as usize
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}
