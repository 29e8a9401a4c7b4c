//! Nearest-neighbour lookup over segment embeddings.
//!
//! Two backends implement [`VectorIndex`]: an HNSW graph ([`HnswIndex`]) and a
//! brute-force cosine scan ([`ExactIndex`]). [`build_vector_index`] picks one at
//! construction time; callers only ever see the trait object.

mod exact;
mod graph;

pub use exact::ExactIndex;
pub use graph::HnswIndex;

use serde::{Deserialize, Serialize};

use crate::error::VectorIndexError;
use crate::models::BackendPreference;

/// Which backend answered a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Hnsw,
    Exact,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Hnsw => write!(f, "hnsw"),
            BackendKind::Exact => write!(f, "exact"),
        }
    }
}

/// One neighbour of a query vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorMatch {
    /// Segment position within the corpus
    pub ordinal: usize,

    /// Backend-native value: squared L2 distance (HNSW) or cosine similarity (exact)
    pub raw: f32,

    /// Similarity in `[-1, 1]`, higher is closer, comparable across backends
    pub score: f32,
}

pub trait VectorIndex: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of the stored vectors, 0 for an empty index.
    fn dimension(&self) -> usize;

    /// The `min(k, len)` nearest vectors, best first.
    fn query(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorIndexError>;
}

/// Build an index over `embeddings`, row `i` becoming ordinal `i`.
///
/// With [`BackendPreference::Auto`] the HNSW backend is tried first; if it
/// cannot be built the exact backend is used instead and the failure is only
/// logged. Ragged rows are rejected for both backends.
pub fn build_vector_index(
    embeddings: Vec<Vec<f32>>,
    preference: BackendPreference,
    ef_search: usize,
) -> Result<Box<dyn VectorIndex>, VectorIndexError> {
    let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = embeddings.iter().find(|row| row.len() != dimension) {
        return Err(VectorIndexError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    if preference == BackendPreference::Auto {
        match HnswIndex::build(&embeddings, ef_search) {
            Ok(index) => {
                tracing::debug!(
                    backend = %BackendKind::Hnsw,
                    vectors = index.len(),
                    dimension,
                    "vector index built"
                );
                return Ok(Box::new(index));
            }
            Err(e) => {
                tracing::warn!(error = %e, "accelerated index unavailable, using exact search");
            }
        }
    }

    let index = ExactIndex::build(embeddings)?;
    tracing::debug!(
        backend = %BackendKind::Exact,
        vectors = index.len(),
        dimension,
        "vector index built"
    );
    Ok(Box::new(index))
}

fn check_query(index: &dyn VectorIndex, query: &[f32]) -> Result<(), VectorIndexError> {
    if query.len() != index.dimension() {
        return Err(VectorIndexError::DimensionMismatch {
            expected: index.dimension(),
            actual: query.len(),
        });
    }
    Ok(())
}
