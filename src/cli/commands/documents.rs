use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use crate::cli::output::IndexStats;
use crate::error::SearchError;
use crate::models::{ChunkingConfig, Document, IndexingConfig, VectorIndexConfig};
use crate::services::{CorpusIndex, Embedder, TextChunker};
use crate::utils::{collect_files, document_name, extract_text, read_file_bytes};

/// Documents read from the command-line paths.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub stats: IndexStats,
}

impl LoadedDocuments {
    pub fn file_names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }
}

/// Read every file under `paths`. Unreadable or oversized files are skipped
/// with a warning; files without extractable text are kept and simply yield
/// no segments.
pub fn load_documents(paths: &[PathBuf], indexing: &IndexingConfig) -> Result<LoadedDocuments> {
    let mut loaded = LoadedDocuments::default();

    for path in paths {
        if !path.exists() {
            anyhow::bail!("path does not exist: {}", path.display());
        }
        let files = collect_files(path, &indexing.exclude_patterns)
            .with_context(|| format!("failed to walk {}", path.display()))?;

        for file in files {
            loaded.stats.files_scanned += 1;
            match read_document(&file, indexing.max_file_size) {
                Ok(document) => {
                    loaded.stats.files_indexed += 1;
                    loaded.documents.push(document);
                }
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "skipping file");
                    loaded.stats.files_skipped += 1;
                }
            }
        }
    }

    tracing::debug!(
        scanned = loaded.stats.files_scanned,
        indexed = loaded.stats.files_indexed,
        skipped = loaded.stats.files_skipped,
        "documents loaded"
    );
    Ok(loaded)
}

pub fn read_document(path: &Path, max_size: u64) -> Result<Document> {
    let bytes = read_file_bytes(path, max_size)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Document::new(document_name(path), extract_text(&bytes, path)))
}

/// Chunker from configuration with optional command-line overrides.
pub fn resolve_chunker(
    chunking: &ChunkingConfig,
    size: Option<u32>,
    overlap: Option<u32>,
) -> Result<TextChunker, SearchError> {
    let config = ChunkingConfig {
        chunk_size: size.unwrap_or(chunking.chunk_size),
        chunk_overlap: overlap.unwrap_or(chunking.chunk_overlap),
        ..chunking.clone()
    };
    TextChunker::from_config(&config)
}

/// Build a corpus index, drawing embedding progress on stderr.
pub fn build_index(
    documents: &[Document],
    chunker: TextChunker,
    embedder: &Embedder,
    index_config: &VectorIndexConfig,
) -> Result<CorpusIndex, SearchError> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let result = CorpusIndex::build_with_progress(
        documents,
        chunker,
        embedder,
        index_config,
        |done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        },
    );

    pb.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_documents_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha text").unwrap();
        fs::write(dir.path().join("b.md"), "# beta").unwrap();
        fs::write(dir.path().join("scan.pdf"), b"%PDF-1.4 \x00\x01").unwrap();

        let loaded = load_documents(&[dir.path().to_path_buf()], &IndexingConfig::default()).unwrap();

        assert_eq!(loaded.stats.files_scanned, 3);
        assert_eq!(loaded.stats.files_indexed, 3);
        assert_eq!(loaded.file_names(), vec!["a.txt", "b.md", "scan.pdf"]);
        let pdf = loaded.documents.iter().find(|d| d.id == "scan.pdf").unwrap();
        assert!(pdf.text.is_empty());
    }

    #[test]
    fn test_pdf_pages_flow_into_results() {
        use crate::models::SearchConfig;
        use crate::services::HybridRanker;
        use crate::test_utils::hashing_embedder;
        use crate::utils::extract::fixtures;

        let dir = tempfile::tempdir().unwrap();
        let pdf = fixtures::pdf(&[Some("Hello World"), Some("Quarterly revenue report")]);
        fs::write(dir.path().join("report.pdf"), pdf).unwrap();
        fs::write(dir.path().join("notes.txt"), "revenue notes").unwrap();

        let loaded = load_documents(&[dir.path().to_path_buf()], &IndexingConfig::default()).unwrap();
        let report = loaded.documents.iter().find(|d| d.id == "report.pdf").unwrap();
        assert!(report.text.contains("[PAGE 2]"));

        let embedder = hashing_embedder(32);
        let chunker = TextChunker::new(24, 12).unwrap();
        let index =
            CorpusIndex::build(&loaded.documents, chunker, &embedder, &VectorIndexConfig::default())
                .unwrap();

        let page_of = |needle: &str| {
            index
                .segments()
                .iter()
                .find(|s| s.document_id == "report.pdf" && s.content.contains(needle))
                .map(|s| s.page)
        };
        assert_eq!(page_of("Hello"), Some(Some(1)));
        assert_eq!(page_of("revenue"), Some(Some(2)));

        let ranker = HybridRanker::new(embedder, &SearchConfig::default());
        let results = ranker.search(&index, "revenue", index.len()).unwrap();
        for result in &results {
            assert_eq!(result.page, index.segments()[result.ordinal].page);
            if result.document_id == "notes.txt" {
                assert_eq!(result.page, None);
            }
        }
    }

    #[test]
    fn test_oversized_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(64)).unwrap();
        fs::write(dir.path().join("small.txt"), "ok").unwrap();

        let indexing = IndexingConfig {
            max_file_size: 16,
            ..Default::default()
        };
        let loaded = load_documents(&[dir.path().to_path_buf()], &indexing).unwrap();

        assert_eq!(loaded.stats.files_skipped, 1);
        assert_eq!(loaded.file_names(), vec!["small.txt"]);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let result = load_documents(
            &[PathBuf::from("/definitely/not/here")],
            &IndexingConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_chunker_overrides() {
        let chunking = ChunkingConfig::default();
        let chunker = resolve_chunker(&chunking, Some(800), None).unwrap();
        assert_eq!(chunker.size(), 800);
        assert_eq!(chunker.overlap(), 150);

        assert!(resolve_chunker(&chunking, Some(100), None).is_err());
        assert!(resolve_chunker(&chunking, None, Some(500)).is_err());
    }
}
