//! Hybrid ranking: vector similarity fused with BM25, deduplicated, top-k.

use std::collections::HashSet;
use std::time::Instant;

use super::corpus::CorpusIndex;
use super::embedding::Embedder;
use super::highlight::match_spans;
use super::vector_index::VectorMatch;
use crate::error::SearchError;
use crate::models::{ScoreNormalization, SearchConfig, SearchResult};
use crate::utils::normalize_whitespace;

/// Ranks corpus segments against a free-text query.
#[derive(Debug, Clone)]
pub struct HybridRanker {
    embedder: Embedder,
    semantic_weight: f32,
    lexical_weight: f32,
    normalization: ScoreNormalization,
    candidate_multiplier: usize,
    exhaustive_threshold: usize,
    definition_boost: f32,
}

#[derive(Debug, Clone)]
struct Candidate {
    ordinal: usize,
    vector: f32,
    lexical: f32,
    fused: f32,
}

impl HybridRanker {
    pub fn new(embedder: Embedder, config: &SearchConfig) -> Self {
        Self {
            embedder,
            semantic_weight: config.semantic_weight,
            lexical_weight: config.lexical_weight,
            normalization: config.normalization,
            candidate_multiplier: (config.candidate_multiplier as usize).max(1),
            exhaustive_threshold: config.exhaustive_threshold as usize,
            definition_boost: config.definition_boost,
        }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// The `k` best distinct segments for `query`, best first.
    ///
    /// Fails with `InvalidParameter` for `k == 0` or a blank query. An empty
    /// corpus gives an empty list without touching the model. Zero-scored
    /// segments still fill the list; only the scores tell them apart.
    pub fn search(
        &self,
        corpus: &CorpusIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if k == 0 {
            return Err(SearchError::invalid("k must be at least 1"));
        }
        if query.trim().is_empty() {
            return Err(SearchError::invalid("query must not be empty"));
        }
        if corpus.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let query_vector = self.embedder.embed_one(query)?;
        let lexical = corpus.lexical().score(query);
        let total = corpus.len();

        let mut pool = self.initial_pool(total, k);
        let kept = loop {
            let matches = corpus.vector_index().query(&query_vector, pool)?;
            let ranked = self.fuse(corpus, query, &matches, &lexical);
            let kept = dedup(corpus, ranked);

            tracing::debug!(pool, candidates = matches.len(), kept = kept.len(), "ranked pool");

            if kept.len() >= k || pool >= total {
                break kept;
            }
            pool = (pool * 2).min(total);
        };

        let results: Vec<SearchResult> = kept
            .into_iter()
            .take(k)
            .filter_map(|c| {
                let segment = corpus.segment(c.ordinal)?;
                Some(SearchResult {
                    document_id: segment.document_id.clone(),
                    chunk_index: segment.chunk_index,
                    ordinal: c.ordinal,
                    content: segment.content.clone(),
                    score: c.fused,
                    vector_score: c.vector,
                    lexical_score: c.lexical,
                    matches: match_spans(&segment.content, query),
                    start_offset: segment.start_offset,
                    end_offset: segment.end_offset,
                    page: segment.page,
                })
            })
            .collect();

        tracing::debug!(
            k,
            returned = results.len(),
            backend = %corpus.backend(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "search complete"
        );

        Ok(results)
    }

    fn initial_pool(&self, total: usize, k: usize) -> usize {
        if total <= self.exhaustive_threshold {
            total
        } else {
            k.saturating_mul(self.candidate_multiplier).min(total)
        }
    }

    /// Normalize both columns over the pool, combine, and sort.
    fn fuse(
        &self,
        corpus: &CorpusIndex,
        query: &str,
        matches: &[VectorMatch],
        lexical: &[f32],
    ) -> Vec<Candidate> {
        // Shift similarities from [-1, 1] to [0, 1] so both columns are non-negative
        let vector_raw: Vec<f32> = matches.iter().map(|m| (m.score + 1.0) / 2.0).collect();
        let lexical_raw: Vec<f32> = matches
            .iter()
            .map(|m| lexical.get(m.ordinal).copied().unwrap_or(0.0))
            .collect();

        let vector_norm = normalize_scores(&vector_raw, self.normalization);
        let lexical_norm = normalize_scores(&lexical_raw, self.normalization);

        let weight_sum = self.semantic_weight + self.lexical_weight;
        let (wv, wl) = if weight_sum > 0.0 {
            (
                self.semantic_weight / weight_sum,
                self.lexical_weight / weight_sum,
            )
        } else {
            (0.5, 0.5)
        };

        let definition_patterns = if self.definition_boost > 1.0 {
            definition_patterns(query)
        } else {
            Vec::new()
        };

        let mut candidates: Vec<Candidate> = matches
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let mut fused = wv * vector_norm[i] + wl * lexical_norm[i];
                if !definition_patterns.is_empty() {
                    let text = corpus
                        .segment(m.ordinal)
                        .map(|s| s.content.to_lowercase())
                        .unwrap_or_default();
                    if definition_patterns.iter().any(|p| text.contains(p.as_str())) {
                        fused = (fused * self.definition_boost).min(1.0);
                    }
                }
                Candidate {
                    ordinal: m.ordinal,
                    vector: vector_norm[i],
                    lexical: lexical_norm[i],
                    fused,
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.fused.total_cmp(&a.fused).then(a.ordinal.cmp(&b.ordinal)));
        candidates
    }
}

/// Keep the first candidate for each distinct whitespace-normalized text.
fn dedup(corpus: &CorpusIndex, ranked: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    ranked
        .into_iter()
        .filter(|c| {
            corpus
                .segment(c.ordinal)
                .map(|s| seen.insert(normalize_whitespace(&s.content)))
                .unwrap_or(false)
        })
        .collect()
}

/// Map `values` into `[0, 1]`.
///
/// `MinMax` rescales the pool's range onto `[0, 1]`; `Max` divides by the
/// pool maximum. When the values carry no spread (all equal, or a maximum of
/// zero), positive values map to 1.0 and the rest to 0.0. A single-candidate
/// pool therefore maps to 1.0 only when its score is positive; a zero lexical
/// score stays 0.0 rather than being promoted to a full keyword match.
pub fn normalize_scores(values: &[f32], method: ScoreNormalization) -> Vec<f32> {
    let degenerate = |v: f32| if v > 0.0 { 1.0 } else { 0.0 };
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    match method {
        ScoreNormalization::MinMax => {
            let min = values.iter().copied().fold(f32::INFINITY, f32::min);
            let range = max - min;
            if range > f32::EPSILON {
                values
                    .iter()
                    .map(|&v| ((v - min) / range).clamp(0.0, 1.0))
                    .collect()
            } else {
                values.iter().map(|&v| degenerate(v)).collect()
            }
        }
        ScoreNormalization::Max => {
            if max > f32::EPSILON {
                values.iter().map(|&v| (v / max).clamp(0.0, 1.0)).collect()
            } else {
                values.iter().map(|&v| degenerate(v)).collect()
            }
        }
    }
}

fn definition_patterns(query: &str) -> Vec<String> {
    let q = normalize_whitespace(&query.to_lowercase());
    if q.is_empty() {
        return Vec::new();
    }
    vec![
        format!("{q} is"),
        format!("definition of {q}"),
        format!("what is {q}"),
        format!("{q} refers to"),
        format!("{q} means"),
        format!("{q}:"),
    ]
}
