//! Flat renderings of a result list for saving to disk.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::models::{OutputFormat, SearchResults};

const RULE_WIDTH: usize = 80;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Export layout, picked from the target file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Markdown,
}

impl ExportFormat {
    /// `.md` and `.markdown` export Markdown, anything else plain text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => ExportFormat::Markdown,
            _ => ExportFormat::Text,
        }
    }
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Markdown => ExportFormat::Markdown,
            _ => ExportFormat::Text,
        }
    }
}

pub fn render(
    format: ExportFormat,
    results: &SearchResults,
    files: &[String],
    generated: NaiveDateTime,
) -> String {
    match format {
        ExportFormat::Text => render_text(results, files, generated),
        ExportFormat::Markdown => render_markdown(results, files, generated),
    }
}

pub fn render_text(results: &SearchResults, files: &[String], generated: NaiveDateTime) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut lines = vec![
        heavy.clone(),
        "DOCFINDER - SEARCH RESULTS".to_string(),
        heavy.clone(),
        format!("Query: {}", results.query),
        format!("Results: {}", results.len()),
        format!("Files: {}", files.join(", ")),
        format!("Generated: {}", generated.format(TIMESTAMP_FORMAT)),
        heavy,
        String::new(),
    ];

    for (i, result) in results.results.iter().enumerate() {
        lines.push(format!("RESULT {}", i + 1));
        lines.push(format!("File: {}", result.document_id));
        lines.push(format!("Chunk: {}", result.chunk_index));
        if let Some(page) = result.page {
            lines.push(format!("Page: ~{}", page));
        }
        lines.push(format!("Confidence: {}%", result.confidence()));
        lines.push(format!("Score: {:.4}", result.score));
        lines.push(light.clone());
        lines.push(result.content.clone());
        lines.push(light.clone());
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn render_markdown(
    results: &SearchResults,
    files: &[String],
    generated: NaiveDateTime,
) -> String {
    let mut lines = vec![
        "# Search Results".to_string(),
        format!("**Query:** `{}`", results.query),
        format!("**Results:** {}", results.len()),
        format!("**Files:** {}", files.join(", ")),
        format!("**Generated:** {}", generated.format(TIMESTAMP_FORMAT)),
        String::new(),
    ];

    for (i, result) in results.results.iter().enumerate() {
        lines.push(format!("## Result {}", i + 1));
        lines.push(format!("- **File:** {}", result.document_id));
        lines.push(format!("- **Chunk:** {}", result.chunk_index));
        if let Some(page) = result.page {
            lines.push(format!("- **Page:** ~{}", page));
        }
        lines.push(format!("- **Confidence:** {}%", result.confidence()));
        lines.push(format!("- **Score:** {:.4}", result.score));
        lines.push(String::new());
        lines.push("```".to_string());
        lines.push(result.content.clone());
        lines.push("```".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}
