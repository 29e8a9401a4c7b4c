//! Utility modules.

pub mod extract;
pub mod file;
pub mod text;

pub use file::{collect_files, document_name, extract_text, read_file_bytes};
pub use text::{normalize_whitespace, page_at, page_markers, tokenize};
