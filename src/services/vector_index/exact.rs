use ndarray::{Array1, Array2, ArrayView1};

use super::{BackendKind, VectorIndex, VectorMatch, check_query};
use crate::error::VectorIndexError;

/// Brute-force cosine similarity against every stored vector.
pub struct ExactIndex {
    matrix: Array2<f32>,
    norms: Array1<f32>,
}

impl ExactIndex {
    pub fn empty() -> Self {
        Self {
            matrix: Array2::zeros((0, 0)),
            norms: Array1::zeros(0),
        }
    }

    pub fn build(embeddings: Vec<Vec<f32>>) -> Result<Self, VectorIndexError> {
        let rows = embeddings.len();
        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);

        let mut flat = Vec::with_capacity(rows * dimension);
        for row in embeddings {
            if row.len() != dimension {
                return Err(VectorIndexError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
            flat.extend(row);
        }

        let matrix = Array2::from_shape_vec((rows, dimension), flat)
            .map_err(|e| VectorIndexError::BackendUnavailable(e.to_string()))?;
        let norms = matrix
            .rows()
            .into_iter()
            .map(|r| r.dot(&r).sqrt())
            .collect();

        Ok(Self { matrix, norms })
    }
}

impl VectorIndex for ExactIndex {
    fn backend(&self) -> BackendKind {
        BackendKind::Exact
    }

    fn len(&self) -> usize {
        self.matrix.nrows()
    }

    fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    fn query(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorIndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        check_query(self, query)?;

        let q = ArrayView1::from(query);
        let q_norm = q.dot(&q).sqrt();
        let dots = self.matrix.dot(&q);

        let mut scored: Vec<(usize, f32)> = dots
            .iter()
            .zip(self.norms.iter())
            .enumerate()
            .map(|(i, (&dot, &norm))| {
                let denom = norm * q_norm;
                let sim = if denom > 0.0 { dot / denom } else { 0.0 };
                (i, if sim.is_finite() { sim } else { -1.0 })
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(ordinal, sim)| VectorMatch {
                ordinal,
                raw: sim,
                score: sim.clamp(-1.0, 1.0),
            })
            .collect())
    }
}
