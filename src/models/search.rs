//! Search-related models for queries and results.

use serde::{Deserialize, Serialize};

/// Output format for search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Character span of a query term inside a result's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    /// Inclusive start, in characters
    pub start: usize,
    /// Exclusive end, in characters
    pub end: usize,
}

/// A single ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Source filename
    pub document_id: String,

    /// Chunk index within the source document
    pub chunk_index: u32,

    /// Position of the segment within the whole corpus
    pub ordinal: usize,

    /// Segment text
    pub content: String,

    /// Fused score (0.0-1.0)
    pub score: f32,

    /// Normalized vector-similarity component
    pub vector_score: f32,

    /// Normalized lexical component
    pub lexical_score: f32,

    /// Query-term occurrences for highlighting
    pub matches: Vec<MatchSpan>,

    pub start_offset: usize,
    pub end_offset: usize,

    /// Estimated source page, when the document was extracted with page markers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SearchResult {
    /// Whole-percent confidence, truncated.
    pub fn confidence(&self) -> u32 {
        (self.score.clamp(0.0, 1.0) * 100.0) as u32
    }
}

/// Collection of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Query that was executed
    pub query: String,

    /// Matching results
    pub results: Vec<SearchResult>,

    /// Segments in the searched corpus
    pub total_segments: u64,

    /// Query execution time in milliseconds
    pub duration_ms: u64,
}

impl SearchResults {
    pub fn new(
        query: String,
        results: Vec<SearchResult>,
        total_segments: u64,
        duration_ms: u64,
    ) -> Self {
        Self {
            query,
            results,
            total_segments,
            duration_ms,
        }
    }

    /// Check if there are no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Get the number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Keep only results at or above `min_score`.
    pub fn retain_min_score(&mut self, min_score: f32) {
        self.results.retain(|r| r.score >= min_score);
    }
}
