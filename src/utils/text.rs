//! Text processing utilities.

use regex::Regex;
use std::sync::LazyLock;

static RE_PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[PAGE (\d+)\]").unwrap());

/// Collapse every run of whitespace into a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Lowercase `text` and split it on every non-alphanumeric character.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `[PAGE n]` markers in `text`, as (character offset, page number) pairs.
pub fn page_markers(text: &str) -> Vec<(usize, u32)> {
    let mut markers = Vec::new();
    let mut chars = 0;
    let mut last_byte = 0;

    for caps in RE_PAGE_MARKER.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Ok(page) = caps[1].parse::<u32>() else {
            continue;
        };
        chars += text[last_byte..whole.start()].chars().count();
        last_byte = whole.start();
        markers.push((chars, page));
    }
    markers
}

/// Page holding character `offset`, given markers from [`page_markers`].
///
/// Text before the first marker belongs to the first page. Returns `None`
/// when the text carries no markers.
pub fn page_at(markers: &[(usize, u32)], offset: usize) -> Option<u32> {
    let (_, first) = markers.first()?;
    Some(
        markers
            .iter()
            .take_while(|(start, _)| *start <= offset)
            .last()
            .map_or(*first, |(_, page)| *page),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace(" \n\t "), "");
        assert_eq!(normalize_whitespace("a  b\n\nc\t d"), "a b c d");
        assert_eq!(normalize_whitespace("  lead and trail  "), "lead and trail");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Data-Visualization, storytelling!"),
            vec!["data", "visualization", "storytelling"]
        );
        assert_eq!(tokenize("BM25 v2.0"), vec!["bm25", "v2", "0"]);
        assert!(tokenize("--- ...").is_empty());
    }

    #[test]
    fn test_tokenize_unicode() {
        assert_eq!(tokenize("Ünïcode naïve"), vec!["ünïcode", "naïve"]);
    }

    #[test]
    fn test_page_markers_use_character_offsets() {
        let text = "[PAGE 1] héllo wörld [PAGE 2] second [PAGE x] [PAGE 4] last";
        let markers = page_markers(text);
        assert_eq!(markers, vec![(0, 1), (21, 2), (46, 4)]);
        assert_eq!(&text.chars().skip(21).take(8).collect::<String>(), "[PAGE 2]");
    }

    #[test]
    fn test_page_at() {
        let markers = vec![(5, 2), (40, 3)];
        assert_eq!(page_at(&markers, 0), Some(2));
        assert_eq!(page_at(&markers, 5), Some(2));
        assert_eq!(page_at(&markers, 39), Some(2));
        assert_eq!(page_at(&markers, 40), Some(3));
        assert_eq!(page_at(&markers, 1000), Some(3));
        assert_eq!(page_at(&[], 10), None);
    }
}
