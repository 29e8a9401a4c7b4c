//! The built state for one set of documents, and its memoization.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use super::chunker::TextChunker;
use super::embedding::Embedder;
use super::lexical::LexicalIndex;
use super::vector_index::{BackendKind, ExactIndex, VectorIndex, build_vector_index};
use crate::error::SearchError;
use crate::models::{Document, Segment, VectorIndexConfig};

/// Segments, their embeddings and lexical statistics for one document set
/// under one chunking configuration.
///
/// Built in one go and never mutated afterwards; a changed input means a new
/// `CorpusIndex`.
pub struct CorpusIndex {
    documents: Vec<String>,
    segments: Vec<Segment>,
    vector_index: Box<dyn VectorIndex>,
    lexical: LexicalIndex,
    chunker: Option<TextChunker>,
    build_time: Duration,
}

impl std::fmt::Debug for CorpusIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusIndex")
            .field("documents", &self.documents.len())
            .field("segments", &self.segments.len())
            .field("backend", &self.vector_index.backend())
            .field("build_time", &self.build_time)
            .finish()
    }
}

impl CorpusIndex {
    /// An index over no documents.
    pub fn empty() -> Self {
        Self {
            documents: Vec::new(),
            segments: Vec::new(),
            vector_index: Box::new(ExactIndex::empty()),
            lexical: LexicalIndex::default(),
            chunker: None,
            build_time: Duration::ZERO,
        }
    }

    pub fn build(
        documents: &[Document],
        chunker: TextChunker,
        embedder: &Embedder,
        index_config: &VectorIndexConfig,
    ) -> Result<Self, SearchError> {
        Self::build_with_progress(documents, chunker, embedder, index_config, |_, _| {})
    }

    /// Build, reporting `(embedded, total)` segment counts after each batch.
    pub fn build_with_progress<F>(
        documents: &[Document],
        chunker: TextChunker,
        embedder: &Embedder,
        index_config: &VectorIndexConfig,
        on_embed: F,
    ) -> Result<Self, SearchError>
    where
        F: FnMut(usize, usize),
    {
        let start = Instant::now();

        let segments: Vec<Segment> = documents
            .iter()
            .flat_map(|doc| {
                let segments = chunker.chunk(doc);
                if segments.is_empty() {
                    tracing::debug!(document = %doc.id, "document contributes no segments");
                }
                segments
            })
            .collect();

        tracing::info!(
            documents = documents.len(),
            segments = segments.len(),
            chunk_size = chunker.size(),
            overlap = chunker.overlap(),
            "building corpus index"
        );

        let texts: Vec<String> = segments.iter().map(|s| s.content.clone()).collect();
        let embeddings = embedder.embed_with_progress(&texts, on_embed)?;

        let vector_index = build_vector_index(
            embeddings,
            index_config.backend,
            index_config.ef_search as usize,
        )?;
        let lexical = LexicalIndex::build(&segments);

        let build_time = start.elapsed();
        tracing::info!(
            segments = segments.len(),
            backend = %vector_index.backend(),
            elapsed_ms = build_time.as_millis() as u64,
            "corpus index ready"
        );

        Ok(Self {
            documents: documents.iter().map(|d| d.id.clone()).collect(),
            segments,
            vector_index,
            lexical,
            chunker: Some(chunker),
            build_time,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, ordinal: usize) -> Option<&Segment> {
        self.segments.get(ordinal)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Identifiers of the indexed documents, in input order.
    pub fn document_ids(&self) -> &[String] {
        &self.documents
    }

    pub fn vector_index(&self) -> &dyn VectorIndex {
        self.vector_index.as_ref()
    }

    pub fn backend(&self) -> BackendKind {
        self.vector_index.backend()
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    /// Chunking parameters used, `None` for [`CorpusIndex::empty`].
    pub fn chunker(&self) -> Option<TextChunker> {
        self.chunker
    }

    pub fn build_time(&self) -> Duration {
        self.build_time
    }
}

/// Content hash of a document set and its chunking parameters.
pub fn corpus_key(documents: &[Document], chunker: &TextChunker) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update((doc.id.len() as u64).to_le_bytes());
        hasher.update(doc.id.as_bytes());
        hasher.update((doc.text.len() as u64).to_le_bytes());
        hasher.update(doc.text.as_bytes());
    }
    hasher.update((chunker.size() as u64).to_le_bytes());
    hasher.update((chunker.overlap() as u64).to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Remembers the last built [`CorpusIndex`] and the key it was built for.
///
/// A lookup with a different key drops the remembered index. A new index is
/// stored only once its build has succeeded, so readers holding an `Arc` from
/// an earlier lookup never see a partial index.
#[derive(Debug, Default)]
pub struct IndexCache {
    entry: Option<(String, Arc<CorpusIndex>)>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached index for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<Arc<CorpusIndex>> {
        match self.entry {
            Some((ref cached, ref index)) if cached == key => Some(Arc::clone(index)),
            _ => None,
        }
    }

    pub fn store(&mut self, key: String, index: Arc<CorpusIndex>) {
        self.entry = Some((key, index));
    }

    pub fn current(&self) -> Option<Arc<CorpusIndex>> {
        self.entry.as_ref().map(|(_, index)| Arc::clone(index))
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Return the cached index for these inputs, or build and cache a new one.
    pub fn get_or_build<F>(
        &mut self,
        documents: &[Document],
        chunker: TextChunker,
        build: F,
    ) -> Result<Arc<CorpusIndex>, SearchError>
    where
        F: FnOnce(&[Document], TextChunker) -> Result<CorpusIndex, SearchError>,
    {
        let key = corpus_key(documents, &chunker);
        if let Some(index) = self.lookup(&key) {
            tracing::debug!(key = %&key[..12], "corpus index cache hit");
            return Ok(index);
        }

        tracing::debug!(key = %&key[..12], "corpus index cache miss");
        self.invalidate();
        let index = Arc::new(build(documents, chunker)?);
        self.store(key, Arc::clone(&index));
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackendPreference;
    use crate::test_utils::{FailingModel, hashing_embedder};

    fn docs() -> Vec<Document> {
        vec![
            Document::new(
                "a.txt",
                "Rust ownership rules prevent data races at compile time.",
            ),
            Document::new(
                "b.txt",
                "Borrowing lets functions use values without taking ownership.",
            ),
        ]
    }

    fn build(documents: &[Document], chunker: TextChunker) -> Result<CorpusIndex, SearchError> {
        CorpusIndex::build(
            documents,
            chunker,
            &hashing_embedder(32),
            &VectorIndexConfig::default(),
        )
    }

    #[test]
    fn test_build_indexes_every_segment() {
        let chunker = TextChunker::new(24, 6).unwrap();
        let index = build(&docs(), chunker).unwrap();

        let expected: usize = docs().iter().map(|d| chunker.chunk(d).len()).sum();
        assert_eq!(index.len(), expected);
        assert_eq!(index.vector_index().len(), expected);
        assert_eq!(index.lexical().len(), expected);
        assert_eq!(index.vector_index().dimension(), 32);
        assert_eq!(index.document_ids(), &["a.txt".to_string(), "b.txt".to_string()]);
        assert_eq!(index.chunker(), Some(chunker));
    }

    #[test]
    fn test_segments_keep_document_order() {
        let index = build(&docs(), TextChunker::new(24, 6).unwrap()).unwrap();
        let first_b = index
            .segments()
            .iter()
            .position(|s| s.document_id == "b.txt")
            .unwrap();
        assert!(index.segments()[..first_b].iter().all(|s| s.document_id == "a.txt"));
        assert_eq!(index.segments()[first_b].chunk_index, 0);
    }

    #[test]
    fn test_empty_inputs_build_empty_index() {
        let chunker = TextChunker::new(24, 6).unwrap();
        assert!(build(&[], chunker).unwrap().is_empty());

        let blank = vec![Document::new("scan.pdf", "")];
        let index = build(&blank, chunker).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.document_ids().len(), 1);
    }

    #[test]
    fn test_exact_backend_is_honoured() {
        let config = VectorIndexConfig {
            backend: BackendPreference::Exact,
            ..Default::default()
        };
        let index = CorpusIndex::build(
            &docs(),
            TextChunker::new(24, 6).unwrap(),
            &hashing_embedder(16),
            &config,
        )
        .unwrap();
        assert_eq!(index.backend(), BackendKind::Exact);
    }

    #[test]
    fn test_model_failure_aborts_build() {
        let embedder = Embedder::with_default_batch_size(Arc::new(FailingModel));
        let err = CorpusIndex::build(
            &docs(),
            TextChunker::new(24, 6).unwrap(),
            &embedder,
            &VectorIndexConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::Embedding(_)));
    }

    #[test]
    fn test_corpus_key_tracks_inputs() {
        let chunker = TextChunker::new(24, 6).unwrap();
        let base = corpus_key(&docs(), &chunker);

        assert_eq!(base, corpus_key(&docs(), &chunker));
        assert_eq!(base.len(), 64);
        assert_ne!(base, corpus_key(&docs(), &TextChunker::new(24, 7).unwrap()));
        assert_ne!(base, corpus_key(&docs(), &TextChunker::new(25, 6).unwrap()));
        assert_ne!(base, corpus_key(&docs()[..1], &chunker));

        let mut edited = docs();
        edited[1].text.push('!');
        assert_ne!(base, corpus_key(&edited, &chunker));

        // Moving bytes between id and text must change the key
        let a = vec![Document::new("ab", "c")];
        let b = vec![Document::new("a", "bc")];
        assert_ne!(corpus_key(&a, &chunker), corpus_key(&b, &chunker));
    }

    #[test]
    fn test_cache_reuses_identical_inputs() {
        let mut cache = IndexCache::new();
        let chunker = TextChunker::new(24, 6).unwrap();
        let mut builds = 0;

        let first = cache
            .get_or_build(&docs(), chunker, |d, c| {
                builds += 1;
                build(d, c)
            })
            .unwrap();
        let second = cache
            .get_or_build(&docs(), chunker, |d, c| {
                builds += 1;
                build(d, c)
            })
            .unwrap();

        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_rebuilds_on_parameter_change() {
        let mut cache = IndexCache::new();
        let old = cache
            .get_or_build(&docs(), TextChunker::new(24, 6).unwrap(), build)
            .unwrap();
        let new = cache
            .get_or_build(&docs(), TextChunker::new(30, 6).unwrap(), build)
            .unwrap();

        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(old.chunker().map(|c| c.size()), Some(24));
        assert!(Arc::ptr_eq(&cache.current().unwrap(), &new));
    }

    #[test]
    fn test_failed_build_leaves_cache_empty() {
        let mut cache = IndexCache::new();
        let chunker = TextChunker::new(24, 6).unwrap();
        cache.get_or_build(&docs(), chunker, build).unwrap();

        let result = cache.get_or_build(&docs()[..1], chunker, |_, _| {
            Err(SearchError::invalid("boom"))
        });
        assert!(result.is_err());
        assert!(cache.current().is_none());
    }

    #[test]
    fn test_lookup_and_invalidate() {
        let mut cache = IndexCache::new();
        let chunker = TextChunker::new(24, 6).unwrap();
        let key = corpus_key(&docs(), &chunker);

        assert!(cache.lookup(&key).is_none());
        cache.store(key.clone(), Arc::new(CorpusIndex::empty()));
        assert!(cache.lookup(&key).is_some());
        assert!(cache.lookup("other").is_none());

        cache.invalidate();
        assert!(cache.lookup(&key).is_none());
    }
}
