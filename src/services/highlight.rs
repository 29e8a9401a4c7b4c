//! Locating query terms inside result text.

use regex::RegexBuilder;

use crate::models::MatchSpan;
use crate::utils::tokenize;

/// Case-insensitive occurrences of the query's tokens in `text`.
///
/// Spans are character offsets, ascending and non-overlapping. Longer terms
/// take precedence where two terms start at the same position.
pub fn match_spans(text: &str, query: &str) -> Vec<MatchSpan> {
    let mut terms = tokenize(query);
    if terms.is_empty() || text.is_empty() {
        return Vec::new();
    }
    terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    terms.dedup();

    let pattern = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");

    let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!(error = %e, "could not build highlight pattern");
            return Vec::new();
        }
    };

    let mut spans = Vec::new();
    let mut chars_before = 0;
    let mut last_byte = 0;
    for m in re.find_iter(text) {
        chars_before += text[last_byte..m.start()].chars().count();
        let len = m.as_str().chars().count();
        spans.push(MatchSpan {
            start: chars_before,
            end: chars_before + len,
        });
        chars_before += len;
        last_byte = m.end();
    }
    spans
}

/// Split `text` into runs, flagging the runs covered by `spans`.
pub fn split_by_spans<'a>(text: &'a str, spans: &[MatchSpan]) -> Vec<(&'a str, bool)> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let byte_at = |c: usize| boundaries.get(c).copied().unwrap_or(text.len());

    let mut pieces = Vec::new();
    let mut cursor = 0;
    for span in spans {
        let start = byte_at(span.start).max(cursor);
        let end = byte_at(span.end).max(start);
        if start > cursor {
            pieces.push((&text[cursor..start], false));
        }
        if end > start {
            pieces.push((&text[start..end], true));
        }
        cursor = end;
    }
    if cursor < text.len() {
        pieces.push((&text[cursor..], false));
    }
    pieces
}
