//! File utilities: collecting input files and extracting their text.

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::extract;

/// Read file bytes with a size limit.
pub fn read_file_bytes(path: &Path, max_size: u64) -> std::io::Result<Vec<u8>> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read(path)
}

/// Plain text of a file's bytes.
///
/// PDFs contribute the text of each page behind a `[PAGE n]` marker and DOCX
/// files their paragraphs. Anything without a readable text layer (scans,
/// damaged files, other binaries) yields an empty string, so such a document
/// simply contributes no segments.
pub fn extract_text(bytes: &[u8], path: &Path) -> String {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let extracted = match ext.as_str() {
        "pdf" => extract::pdf_text(bytes),
        "docx" => extract::docx_text(bytes),
        _ if is_binary_extension(&ext) || bytes.contains(&0) => Ok(String::new()),
        _ => return String::from_utf8_lossy(bytes).into_owned(),
    };

    match extracted {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "no text layer could be extracted");
            String::new()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "no text layer could be extracted");
            String::new()
        }
    }
}

/// Collect files under `path`, skipping anything matching an exclude pattern.
pub fn collect_files(path: &Path, exclude: &[String]) -> std::io::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let patterns: Vec<glob::Pattern> = exclude
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::other)?;
        let entry_path = entry.path();

        if !entry_path.is_file() {
            continue;
        }

        let path_str = entry_path.to_string_lossy();
        if patterns.iter().any(|p| p.matches(&path_str)) {
            continue;
        }

        files.push(entry_path.to_path_buf());
    }

    Ok(files)
}

/// Display name for a document: its file name, or the full path as fallback.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Check if extension indicates a binary file.
fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "exe"
            | "dll"
            | "so"
            | "dylib"
            | "o"
            | "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "bmp"
            | "webp"
            | "mp3"
            | "mp4"
            | "wav"
            | "zip"
            | "tar"
            | "gz"
            | "7z"
            | "pdf"
            | "doc"
            | "docx"
            | "xls"
            | "xlsx"
            | "ppt"
            | "pptx"
            | "odt"
            | "epub"
            | "db"
            | "sqlite"
            | "bin"
    )
}
