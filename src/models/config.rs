use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en-v1.5";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;
pub const PROJECT_CONFIG_FILE: &str = ".docfinder.toml";

const ENV_MODEL_ID: &str = "DOCFINDER_MODEL_ID";
const ENV_MODEL_PATH: &str = "DOCFINDER_MODEL_PATH";
const ENV_BACKEND: &str = "DOCFINDER_BACKEND";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub vector_index: VectorIndexConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// A loaded configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub loaded_from: Option<PathBuf>,
}

impl Config {
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("docfinder").join("config.toml"))
    }

    pub fn project_path() -> Option<PathBuf> {
        std::env::current_dir()
            .ok()
            .map(|p| p.join(PROJECT_CONFIG_FILE))
    }

    /// Load the project config if present, else the global one, else defaults.
    /// Environment overrides are applied last.
    pub fn load() -> Result<ResolvedConfig, ConfigError> {
        let candidates = [Self::project_path(), Self::global_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                let mut config = Self::from_file(&path)?;
                config.apply_env_overrides();
                config.validate()?;
                return Ok(ResolvedConfig {
                    config,
                    loaded_from: Some(path),
                });
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(ResolvedConfig {
            config,
            loaded_from: None,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn init_global() -> Result<PathBuf, ConfigError> {
        let path = Self::global_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        Self::default().save_to(&path)?;
        Ok(path)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(model_id) = std::env::var(ENV_MODEL_ID)
            && !model_id.trim().is_empty()
        {
            self.embedding.model_id = model_id;
        }
        if let Ok(model_path) = std::env::var(ENV_MODEL_PATH)
            && !model_path.trim().is_empty()
        {
            self.embedding.model_path = Some(PathBuf::from(model_path));
        }
        if let Ok(backend) = std::env::var(ENV_BACKEND)
            && let Ok(backend) = backend.parse()
        {
            self.vector_index.backend = backend;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be at least 1".to_string(),
            ));
        }
        if self.chunking.min_chunk_size > self.chunking.max_chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.min_chunk_size ({}) exceeds chunking.max_chunk_size ({})",
                self.chunking.min_chunk_size, self.chunking.max_chunk_size
            )));
        }

        let weights = [self.search.semantic_weight, self.search.lexical_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::ValidationError(
                "search weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.iter().all(|w| *w == 0.0) {
            return Err(ConfigError::ValidationError(
                "at least one search weight must be positive".to_string(),
            ));
        }
        if self.search.candidate_multiplier == 0 {
            return Err(ConfigError::ValidationError(
                "search.candidate_multiplier must be at least 1".to_string(),
            ));
        }
        if !self.search.definition_boost.is_finite() || self.search.definition_boost < 1.0 {
            return Err(ConfigError::ValidationError(
                "search.definition_boost must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pooling applied to the token embeddings produced by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// First (`[CLS]`) token, as BGE models expect
    #[default]
    Cls,
    /// Attention-masked mean over all tokens
    Mean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Local directory holding `model.onnx` and `tokenizer.json`.
    /// When unset the files are fetched into the HuggingFace cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub pooling: Pooling,
}

fn default_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_batch_size() -> u32 {
    64
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            model_path: None,
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            max_tokens: default_max_tokens(),
            pooling: Pooling::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared by consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: u32,

    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u32,
}

fn default_chunk_size() -> u32 {
    500
}

fn default_chunk_overlap() -> u32 {
    150
}

fn default_min_chunk_size() -> u32 {
    300
}

fn default_max_chunk_size() -> u32 {
    1500
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

/// How raw vector and lexical scores are mapped into [0, 1] before fusion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// `(x - min) / (max - min)` over the candidate pool
    #[default]
    MinMax,
    /// `x / max` over the candidate pool
    Max,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default)]
    pub default_format: OutputFormat,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    #[serde(default)]
    pub normalization: ScoreNormalization,

    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: u32,

    /// Corpora with at most this many segments rank every segment.
    #[serde(default = "default_exhaustive_threshold")]
    pub exhaustive_threshold: u32,

    /// Multiplier for segments that read like a definition of the query.
    /// 1.0 disables the boost.
    #[serde(default = "default_definition_boost")]
    pub definition_boost: f32,
}

fn default_limit() -> u32 {
    5
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_lexical_weight() -> f32 {
    0.3
}

fn default_candidate_multiplier() -> u32 {
    4
}

fn default_exhaustive_threshold() -> u32 {
    256
}

fn default_definition_boost() -> f32 {
    1.0
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_format: OutputFormat::Text,
            semantic_weight: default_semantic_weight(),
            lexical_weight: default_lexical_weight(),
            normalization: ScoreNormalization::default(),
            candidate_multiplier: default_candidate_multiplier(),
            exhaustive_threshold: default_exhaustive_threshold(),
            definition_boost: default_definition_boost(),
        }
    }
}

/// Which nearest-neighbour backend to try first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// HNSW graph when it can be built, exact scan otherwise
    #[default]
    Auto,
    /// Always the exact cosine scan
    Exact,
}

impl std::str::FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "hnsw" => Ok(BackendPreference::Auto),
            "exact" | "brute" | "brute-force" => Ok(BackendPreference::Exact),
            _ => Err(format!("unknown vector backend: {}", s)),
        }
    }
}

impl std::fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            BackendPreference::Exact => write!(f, "exact"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default)]
    pub backend: BackendPreference,

    #[serde(default = "default_ef_search")]
    pub ef_search: u32,
}

fn default_ef_search() -> u32 {
    64
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            ef_search: default_ef_search(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.venv/**".to_string(),
        "**/__pycache__/**".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: default_exclude_patterns(),
            max_file_size: default_max_file_size(),
        }
    }
}
