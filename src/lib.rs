pub mod cli;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use cli::{Cli, Commands};
pub use error::{ConfigError, EmbeddingError, ExtractError, SearchError, VectorIndexError};
pub use models::{Config, Document, OutputFormat, SearchResult, Segment};
pub use services::{CorpusIndex, Embedder, HybridRanker, TextChunker};
