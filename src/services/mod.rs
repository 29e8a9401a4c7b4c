pub mod chunker;
pub mod corpus;
pub mod embedding;
pub mod export;
pub mod highlight;
pub mod lexical;
pub mod ranker;
pub mod vector_index;

pub use chunker::{TextChunker, chunk_text};
pub use corpus::{CorpusIndex, IndexCache, corpus_key};
pub use embedding::{
    Embedder, EmbeddingModel, LazyEmbeddingModel, OnnxEmbeddingModel, SharedEmbeddingModel,
};
pub use export::ExportFormat;
pub use highlight::match_spans;
pub use lexical::LexicalIndex;
pub use ranker::HybridRanker;
pub use vector_index::{
    BackendKind, ExactIndex, HnswIndex, VectorIndex, VectorMatch, build_vector_index,
};
