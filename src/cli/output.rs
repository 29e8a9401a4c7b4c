use std::fmt::Write as FmtWrite;

use console::style;
use serde::Serialize;

use crate::models::{OutputFormat, SearchResult, SearchResults, Segment};
use crate::services::highlight::split_by_spans;

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_segments(&self, document: &str, segments: &[Segment]) -> String;
    fn format_index_stats(&self, stats: &IndexStats) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_scanned: u64,
    pub files_indexed: u64,
    pub files_skipped: u64,
    pub segments: u64,
    pub backend: String,
    pub duration_ms: u64,
}

/// Result text with matched spans emphasised.
fn highlighted(result: &SearchResult) -> String {
    split_by_spans(&result.content, &result.matches)
        .into_iter()
        .map(|(piece, hit)| {
            if hit {
                style(piece).yellow().bold().to_string()
            } else {
                piece.to_string()
            }
        })
        .collect()
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", results.query).unwrap();
        writeln!(
            output,
            "Top {} of {} segments in {}ms\n",
            results.len(),
            results.total_segments,
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(
                output,
                "{}. {} (chunk {}{}) [Score: {:.3}, Confidence: {}%]",
                i + 1,
                style(&result.document_id).cyan(),
                result.chunk_index,
                page_note(result.page),
                result.score,
                result.confidence()
            )
            .unwrap();
            writeln!(
                output,
                "   semantic {:.3} | keyword {:.3}",
                result.vector_score, result.lexical_score
            )
            .unwrap();
            writeln!(output, "   ---").unwrap();
            writeln!(output, "   {}", highlighted(result)).unwrap();
            writeln!(output).unwrap();
        }

        output
    }

    fn format_segments(&self, document: &str, segments: &[Segment]) -> String {
        if segments.is_empty() {
            return format!("{}: no segments\n", document);
        }

        let mut output = String::new();
        writeln!(output, "{}: {} segments\n", document, segments.len()).unwrap();
        for segment in segments {
            writeln!(
                output,
                "[{}] chars {}..{}{}",
                segment.chunk_index,
                segment.start_offset,
                segment.end_offset,
                page_note(segment.page)
            )
            .unwrap();
            writeln!(output, "   {}", segment.content).unwrap();
            writeln!(output).unwrap();
        }
        output
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        let mut output = String::new();
        writeln!(output, "Index Ready").unwrap();
        writeln!(output, "-----------").unwrap();
        writeln!(output, "Files scanned: {}", stats.files_scanned).unwrap();
        writeln!(output, "Files indexed: {}", stats.files_indexed).unwrap();
        writeln!(output, "Files skipped: {}", stats.files_skipped).unwrap();
        writeln!(output, "Segments: {}", stats.segments).unwrap();
        writeln!(output, "Backend: {}", stats.backend).unwrap();
        writeln!(output, "Duration: {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        self.render(results)
    }

    fn format_segments(&self, document: &str, segments: &[Segment]) -> String {
        self.render(&serde_json::json!({
            "document": document,
            "segments": segments,
        }))
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        self.render(stats)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Search Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();
        writeln!(
            output,
            "Top {} of {} segments in {}ms\n",
            results.len(),
            results.total_segments,
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(
                output,
                "### {}. Score: {:.3} ({}%)\n",
                i + 1,
                result.score,
                result.confidence()
            )
            .unwrap();
            writeln!(
                output,
                "**File:** `{}` chunk {}{}\n",
                result.document_id,
                result.chunk_index,
                page_note(result.page)
            )
            .unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", result.content).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        output
    }

    fn format_segments(&self, document: &str, segments: &[Segment]) -> String {
        let mut output = String::new();
        writeln!(output, "## {}\n", document).unwrap();
        writeln!(output, "{} segments\n", segments.len()).unwrap();
        for segment in segments {
            writeln!(
                output,
                "### Chunk {} (chars {}..{}{})\n",
                segment.chunk_index,
                segment.start_offset,
                segment.end_offset,
                page_note(segment.page)
            )
            .unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", segment.content).unwrap();
            writeln!(output, "```\n").unwrap();
        }
        output
    }

    fn format_index_stats(&self, stats: &IndexStats) -> String {
        let mut output = String::new();
        writeln!(output, "## Index Ready\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Files scanned | {} |", stats.files_scanned).unwrap();
        writeln!(output, "| Files indexed | {} |", stats.files_indexed).unwrap();
        writeln!(output, "| Files skipped | {} |", stats.files_skipped).unwrap();
        writeln!(output, "| Segments | {} |", stats.segments).unwrap();
        writeln!(output, "| Backend | {} |", stats.backend).unwrap();
        writeln!(output, "| Duration | {}ms |", stats.duration_ms).unwrap();
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("**Error:** {}\n", error)
    }
}

/// ", page ~N" for results with a page estimate.
fn page_note(page: Option<u32>) -> String {
    page.map(|p| format!(", page ~{}", p)).unwrap_or_default()
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
