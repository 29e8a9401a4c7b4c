mod config;
mod document;
mod search;

pub use config::{
    BackendPreference, ChunkingConfig, Config, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, EmbeddingConfig, IndexingConfig, PROJECT_CONFIG_FILE, Pooling,
    ResolvedConfig, ScoreNormalization, SearchConfig, VectorIndexConfig,
};
pub use document::{Document, Segment};
pub use search::{MatchSpan, OutputFormat, SearchResult, SearchResults};
