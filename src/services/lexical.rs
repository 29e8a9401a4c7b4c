//! Okapi BM25 keyword scoring over the segment collection.

use std::collections::{HashMap, HashSet};

use crate::models::Segment;
use crate::utils::tokenize;

/// Term-frequency saturation.
pub const BM25_K1: f32 = 1.5;
/// Length normalization strength.
pub const BM25_B: f32 = 0.75;

/// Inverted index with the statistics BM25 needs.
///
/// Segments are addressed by their position in the slice passed to
/// [`LexicalIndex::build`].
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    /// term -> (segment ordinal, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    lengths: Vec<u32>,
    avg_length: f32,
}

impl LexicalIndex {
    pub fn build(segments: &[Segment]) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut lengths = Vec::with_capacity(segments.len());

        for (ordinal, segment) in segments.iter().enumerate() {
            let tokens = tokenize(&segment.content);
            lengths.push(tokens.len() as u32);

            let mut counts: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *counts.entry(token).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term).or_default().push((ordinal, tf));
            }
        }

        let total: u64 = lengths.iter().map(|&l| l as u64).sum();
        let avg_length = if lengths.is_empty() {
            0.0
        } else {
            total as f32 / lengths.len() as f32
        };

        Self {
            postings,
            lengths,
            avg_length,
        }
    }

    /// Number of indexed segments.
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Number of segments containing `term` (already lowercased).
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map(Vec::len).unwrap_or(0)
    }

    /// Inverse document frequency, `ln(1 + (N - n + 0.5) / (n + 0.5))`.
    ///
    /// Never negative, even for a term present in every segment.
    pub fn idf(&self, term: &str) -> f32 {
        let n = self.document_frequency(term) as f32;
        let total = self.len() as f32;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }

    /// BM25 score of every segment for `query`, indexed by ordinal.
    ///
    /// Repeated query terms count once. Segments sharing no term with the
    /// query score 0.0; an empty index yields an empty vector.
    pub fn score(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.len()];
        if scores.is_empty() {
            return scores;
        }

        let mut seen = HashSet::new();
        for term in tokenize(query) {
            if !seen.insert(term.clone()) {
                continue;
            }
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };

            let idf = self.idf(&term);
            for &(ordinal, tf) in postings {
                let tf = tf as f32;
                let length_ratio = if self.avg_length > 0.0 {
                    self.lengths[ordinal] as f32 / self.avg_length
                } else {
                    0.0
                };
                let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);
                scores[ordinal] += idf * (tf * (BM25_K1 + 1.0)) / (tf + norm);
            }
        }

        scores
    }
}
