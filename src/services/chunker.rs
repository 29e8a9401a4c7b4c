//! Sliding-window chunking with a fixed overlap.

use std::ops::RangeInclusive;

use crate::error::SearchError;
use crate::models::{ChunkingConfig, Document, Segment};
use crate::utils::{page_at, page_markers};

/// Splits documents into overlapping fixed-size windows of their normalized text.
///
/// Windows are `size` characters long and start every `size - overlap`
/// characters; the final window runs to the end of the text and may be shorter.
/// Output depends only on the text and the two parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker, checking only `0 < overlap < size`.
    pub fn new(size: usize, overlap: usize) -> Result<Self, SearchError> {
        Self::with_bounds(size, overlap, 1..=usize::MAX)
    }

    /// Create a chunker whose `size` must also fall within `bounds`.
    pub fn with_bounds(
        size: usize,
        overlap: usize,
        bounds: RangeInclusive<usize>,
    ) -> Result<Self, SearchError> {
        if !bounds.contains(&size) {
            return Err(SearchError::invalid(format!(
                "chunk size {} outside allowed range {}..={}",
                size,
                bounds.start(),
                bounds.end()
            )));
        }
        if overlap == 0 {
            return Err(SearchError::invalid("chunk overlap must be positive"));
        }
        if overlap >= size {
            return Err(SearchError::invalid(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    /// Create a chunker from configuration, enforcing its size bounds.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self, SearchError> {
        Self::with_bounds(
            config.chunk_size as usize,
            config.chunk_overlap as usize,
            config.min_chunk_size as usize..=config.max_chunk_size as usize,
        )
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.size - self.overlap
    }

    /// Chunk a document into overlapping segments.
    ///
    /// Segments of text carrying `[PAGE n]` markers get the page their first
    /// character falls on.
    pub fn chunk(&self, document: &Document) -> Vec<Segment> {
        let normalized = document.normalized_text();
        let markers = page_markers(&normalized);
        self.split(&normalized)
            .into_iter()
            .enumerate()
            .map(|(idx, (start, end, content))| {
                Segment::new(&document.id, idx as u32, start, end, content)
                    .with_page(page_at(&markers, start))
            })
            .collect()
    }

    /// Window boundaries over already-normalized text, in characters.
    fn split(&self, text: &str) -> Vec<(usize, usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut windows = Vec::new();

        let mut start = 0;
        while start < total {
            let end = (start + self.size).min(total);
            windows.push((start, end, chars[start..end].iter().collect()));

            if end == total {
                break;
            }
            start += self.step();
        }

        windows
    }
}

/// Chunk `text` owned by `document_id` with the given window parameters.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    size: usize,
    overlap: usize,
) -> Result<Vec<Segment>, SearchError> {
    let chunker = TextChunker::new(size, overlap)?;
    Ok(chunker.chunk(&Document::new(document_id, text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("test.txt", text)
    }

    #[test]
    fn test_sliding_window_arithmetic() {
        let chunker = TextChunker::new(10, 4).unwrap();
        let segments = chunker.chunk(&doc("AAAA BBBB CCCC DDDD"));

        let spans: Vec<(usize, usize, &str)> = segments
            .iter()
            .map(|s| (s.start_offset, s.end_offset, s.content.as_str()))
            .collect();
        assert_eq!(
            spans,
            vec![
                (0, 10, "AAAA BBBB "),
                (6, 16, "BBB CCCC D"),
                (12, 19, "CC DDDD"),
            ]
        );
        assert_eq!(segments[0].content[6..], segments[1].content[..4]);
        assert_eq!(&segments[1].content[6..], "CC D");
        assert_eq!(&segments[2].content[..4], "CC D");
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_rejected() {
        let err = TextChunker::new(100, 150).unwrap_err();
        assert!(matches!(err, SearchError::InvalidParameter(_)));
        assert!(TextChunker::new(100, 100).is_err());
    }

    #[test]
    fn test_zero_overlap_is_rejected() {
        assert!(matches!(
            TextChunker::new(100, 0),
            Err(SearchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_size_outside_bounds_is_rejected() {
        assert!(TextChunker::with_bounds(200, 50, 300..=1500).is_err());
        assert!(TextChunker::with_bounds(1600, 50, 300..=1500).is_err());
        assert!(TextChunker::with_bounds(300, 50, 300..=1500).is_ok());
    }

    #[test]
    fn test_from_config_defaults() {
        let chunker = TextChunker::from_config(&ChunkingConfig::default()).unwrap();
        assert_eq!(chunker.size(), 500);
        assert_eq!(chunker.overlap(), 150);
    }

    #[test]
    fn test_empty_document() {
        let chunker = TextChunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&doc("")).is_empty());
        assert!(chunker.chunk(&doc(" \n\t  ")).is_empty());
    }

    #[test]
    fn test_short_document_single_segment() {
        let chunker = TextChunker::new(50, 10).unwrap();
        let segments = chunker.chunk(&doc("Hello,\n\n  world!"));

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "Hello, world!");
        assert_eq!(segments[0].chunk_index, 0);
        assert_eq!(segments[0].start_offset, 0);
        assert_eq!(segments[0].end_offset, 13);
    }

    #[test]
    fn test_segments_reconstruct_normalized_text() {
        let text = "The quick brown fox\njumps over   the lazy dog. ".repeat(17);
        let document = doc(&text);
        let normalized: Vec<char> = document.normalized_text().chars().collect();
        let chunker = TextChunker::new(37, 11).unwrap();
        let segments = chunker.chunk(&document);

        let mut rebuilt: Vec<char> = Vec::new();
        for segment in &segments {
            let chars: Vec<char> = segment.content.chars().collect();
            assert_eq!(chars.len(), segment.char_len());
            assert_eq!(&normalized[segment.start_offset..segment.end_offset], &chars[..]);
            let skip = rebuilt.len().saturating_sub(segment.start_offset);
            rebuilt.extend_from_slice(&chars[skip..]);
        }
        assert_eq!(rebuilt, normalized);
        assert_eq!(segments.last().unwrap().end_offset, normalized.len());
    }

    #[test]
    fn test_adjacent_segments_share_overlap() {
        let text: String = (0..400).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunker = TextChunker::new(60, 15).unwrap();
        let segments = chunker.chunk(&doc(&text));

        assert!(segments.len() > 2);
        for pair in segments.windows(2) {
            let prev: Vec<char> = pair[0].content.chars().collect();
            let next: Vec<char> = pair[1].content.chars().collect();
            assert_eq!(&prev[prev.len() - 15..], &next[..15]);
            assert_eq!(pair[1].start_offset, pair[0].start_offset + 45);
        }
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.chunk_index, i as u32);
        }
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let segments = chunker.chunk(&doc("héllo wörld"));

        assert_eq!(segments[0].content, "héll");
        assert_eq!(segments[1].content, "lo w");
        assert_eq!(segments[1].start_offset, 3);
        assert_eq!(segments.last().unwrap().end_offset, 11);
    }

    #[test]
    fn test_segments_carry_page_estimates() {
        let text = "[PAGE 1]\naaaa aaaa aaaa\n[PAGE 3]\nbbbb bbbb bbbb\n";
        let chunker = TextChunker::new(12, 2).unwrap();
        let segments = chunker.chunk(&doc(text));

        let pages: Vec<(usize, Option<u32>)> =
            segments.iter().map(|s| (s.start_offset, s.page)).collect();
        assert_eq!(
            pages,
            vec![(0, Some(1)), (10, Some(1)), (20, Some(1)), (30, Some(3)), (40, Some(3))]
        );

        let plain = chunker.chunk(&doc("no markers in this text at all"));
        assert!(plain.iter().all(|s| s.page.is_none()));
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = "alpha beta gamma delta epsilon zeta eta theta ".repeat(9);
        let first = chunk_text("d.txt", &text, 40, 12).unwrap();
        let second = chunk_text("d.txt", &text, 40, 12).unwrap();
        assert_eq!(first, second);
    }
}
