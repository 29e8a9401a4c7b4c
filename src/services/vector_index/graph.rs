use hnsw::{Hnsw, Searcher};
use rand::rngs::StdRng;
use space::{Metric, Neighbor};

use super::{BackendKind, VectorIndex, VectorMatch, check_query};
use crate::error::VectorIndexError;

/// Squared Euclidean distance.
///
/// The graph needs an integer unit; the distance is non-negative and finite, so
/// its IEEE-754 bit pattern orders the same way as the float itself.
struct SquaredL2;

impl Metric<Box<[f32]>> for SquaredL2 {
    type Unit = u32;

    fn distance(&self, a: &Box<[f32]>, b: &Box<[f32]>) -> u32 {
        let d: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y) * (x - y))
            .sum();
        if d.is_finite() {
            d.to_bits()
        } else {
            f32::MAX.to_bits()
        }
    }
}

/// HNSW graph over the embeddings, M = 16 and M0 = 32.
pub struct HnswIndex {
    graph: Hnsw<SquaredL2, Box<[f32]>, StdRng, 16, 32>,
    dimension: usize,
    ef_search: usize,
}

impl HnswIndex {
    /// Fails with `BackendUnavailable` when a component is NaN or infinite,
    /// since such a vector cannot be placed in the graph.
    pub fn build(embeddings: &[Vec<f32>], ef_search: usize) -> Result<Self, VectorIndexError> {
        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);

        if let Some(row) = embeddings
            .iter()
            .position(|v| v.iter().any(|x| !x.is_finite()))
        {
            return Err(VectorIndexError::BackendUnavailable(format!(
                "embedding {} has non-finite components",
                row
            )));
        }
        if embeddings.iter().any(|v| v.len() != dimension) {
            return Err(VectorIndexError::BackendUnavailable(
                "embeddings have inconsistent widths".to_string(),
            ));
        }

        let mut graph = Hnsw::new(SquaredL2);
        let mut searcher = Searcher::default();
        for embedding in embeddings {
            graph.insert(embedding.clone().into_boxed_slice(), &mut searcher);
        }

        Ok(Self {
            graph,
            dimension,
            ef_search: ef_search.max(1),
        })
    }

    fn search(&self, query: &Box<[f32]>, wanted: usize, ef: usize) -> Vec<Neighbor<u32>> {
        let mut searcher = Searcher::default();
        let mut neighbors = vec![
            Neighbor {
                index: !0,
                distance: !0
            };
            wanted
        ];
        self.graph.nearest(query, ef, &mut searcher, &mut neighbors);
        neighbors.into_iter().filter(|n| n.index != !0).collect()
    }
}

impl VectorIndex for HnswIndex {
    fn backend(&self) -> BackendKind {
        BackendKind::Hnsw
    }

    fn len(&self) -> usize {
        self.graph.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn query(&self, query: &[f32], k: usize) -> Result<Vec<VectorMatch>, VectorIndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        check_query(self, query)?;

        let wanted = k.min(self.len());
        let query_box = query.to_vec().into_boxed_slice();

        let mut neighbors = self.search(&query_box, wanted, self.ef_search.max(2 * k));
        if neighbors.len() < wanted {
            // Widen the beam to the whole graph so the result count holds
            neighbors = self.search(&query_box, wanted, self.len());
        }

        Ok(neighbors
            .into_iter()
            .map(|n| {
                let distance = f32::from_bits(n.distance);
                VectorMatch {
                    ordinal: n.index,
                    raw: distance,
                    score: (1.0 - distance / 2.0).clamp(-1.0, 1.0),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_bits_preserve_order() {
        let origin: Box<[f32]> = vec![0.0, 0.0].into_boxed_slice();
        let near: Box<[f32]> = vec![0.1, 0.0].into_boxed_slice();
        let far: Box<[f32]> = vec![3.0, 4.0].into_boxed_slice();

        let d_near = SquaredL2.distance(&origin, &near);
        let d_far = SquaredL2.distance(&origin, &far);
        assert!(d_near < d_far);
        assert_eq!(f32::from_bits(d_far), 25.0);
        assert_eq!(SquaredL2.distance(&origin, &origin), 0);
    }

    #[test]
    fn test_nearest_is_ascending_by_distance() {
        let vectors = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.7071, 0.7071],
        ];
        let index = HnswIndex::build(&vectors, 16).unwrap();
        let results = index.query(&[1.0, 0.0], 4).unwrap();

        assert_eq!(results[0].ordinal, 0);
        assert_eq!(results[1].ordinal, 3);
        assert_eq!(results[3].ordinal, 2);
        assert!(results.windows(2).all(|w| w[0].raw <= w[1].raw));
        assert!((results[3].score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_input_is_unavailable() {
        let err = HnswIndex::build(&[vec![1.0, f32::INFINITY]], 16)
            .err()
            .unwrap();
        assert!(matches!(err, VectorIndexError::BackendUnavailable(_)));
    }
}
