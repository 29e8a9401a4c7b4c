use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hf_hub::api::sync::Api;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{EmbeddingModel, normalize};
use crate::error::EmbeddingError;
use crate::models::{EmbeddingConfig, Pooling};

const MODEL_FILE: &str = "model.onnx";
const HUB_MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// A BERT-style sentence encoder run through ONNX Runtime.
///
/// The graph must take `input_ids`, `attention_mask` and `token_type_ids`
/// (in that order) and return token states `[batch, seq, dim]` or pooled
/// vectors `[batch, dim]` as its first output.
pub struct OnnxEmbeddingModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    dimension: usize,
    pooling: Pooling,
}

impl OnnxEmbeddingModel {
    /// Load from `config.model_path`, or fetch into the HuggingFace cache.
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let (model_path, tokenizer_path) = match config.model_path {
            Some(ref dir) => local_files(dir)?,
            None => hub_files(&config.model_id)?,
        };
        Self::load_files(config, &model_path, &tokenizer_path)
    }

    pub fn load_files(
        config: &EmbeddingConfig,
        model_path: &Path,
        tokenizer_path: &Path,
    ) -> Result<Self, EmbeddingError> {
        let max_tokens = config.max_tokens as usize;

        let session = Session::builder()
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // Fixed-length padding keeps each row's tensor independent of its batch
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_tokens),
            ..Default::default()
        }));

        tracing::info!(
            model = %config.model_id,
            path = %model_path.display(),
            dimension = config.dimension,
            "embedding model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: config.model_id.clone(),
            dimension: config.dimension as usize,
            pooling: config.pooling,
        })
    }

    fn run(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            for (j, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[i * seq_len + j] = id as i64;
                attention_mask[i * seq_len + j] = m as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, seq_len], input_ids))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, seq_len], attention_mask.clone()))
                .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, seq_len], token_type_ids))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::Inference("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                input_ids_tensor,
                attention_mask_tensor,
                token_type_ids_tensor
            ])
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let shape = output_array.shape().to_vec();
        let width = *shape.last().unwrap_or(&0);
        if width != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: width,
            });
        }

        let embeddings: Vec<Vec<f32>> = if shape.len() == 3 {
            (0..batch_size)
                .map(|i| {
                    let pooled: Vec<f32> = match self.pooling {
                        Pooling::Cls => (0..self.dimension)
                            .map(|d| output_array[[i, 0, d]])
                            .collect(),
                        Pooling::Mean => {
                            let row_mask = &attention_mask[i * seq_len..(i + 1) * seq_len];
                            let count = row_mask.iter().filter(|&&m| m == 1).count().max(1);
                            (0..self.dimension)
                                .map(|d| {
                                    let sum: f32 = row_mask
                                        .iter()
                                        .enumerate()
                                        .filter(|(_, m)| **m == 1)
                                        .map(|(j, _)| output_array[[i, j, d]])
                                        .sum();
                                    sum / count as f32
                                })
                                .collect()
                        }
                    };
                    normalize(&pooled)
                })
                .collect()
        } else if shape.len() == 2 {
            (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..self.dimension).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect()
        } else {
            return Err(EmbeddingError::Inference(format!(
                "unexpected output shape: {:?}",
                shape
            )));
        };

        Ok(embeddings)
    }
}

impl EmbeddingModel for OnnxEmbeddingModel {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn local_files(dir: &Path) -> Result<(PathBuf, PathBuf), EmbeddingError> {
    let model_path = [dir.join(MODEL_FILE), dir.join(HUB_MODEL_FILE)]
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| {
            EmbeddingError::ModelUnavailable(format!("model not found in: {}", dir.display()))
        })?;

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if !tokenizer_path.exists() {
        return Err(EmbeddingError::ModelUnavailable(format!(
            "tokenizer not found: {}",
            tokenizer_path.display()
        )));
    }

    Ok((model_path, tokenizer_path))
}

/// Download (or reuse from cache) the model and tokenizer files.
fn hub_files(model_id: &str) -> Result<(PathBuf, PathBuf), EmbeddingError> {
    tracing::info!(model = model_id, "fetching embedding model from HuggingFace hub");

    let api = Api::new().map_err(|e| EmbeddingError::ModelUnavailable(e.to_string()))?;
    let repo = api.model(model_id.to_string());

    let model_path = repo.get(HUB_MODEL_FILE).map_err(|e| {
        EmbeddingError::ModelUnavailable(format!("failed to fetch {}: {}", HUB_MODEL_FILE, e))
    })?;
    let tokenizer_path = repo.get(TOKENIZER_FILE).map_err(|e| {
        EmbeddingError::ModelUnavailable(format!("failed to fetch {}: {}", TOKENIZER_FILE, e))
    })?;

    Ok((model_path, tokenizer_path))
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
