use serde::{Deserialize, Serialize};

use crate::utils::normalize_whitespace;

/// A single uploaded document: its source filename and the extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Source filename, used as the document identifier
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Text with whitespace runs collapsed to single spaces and trimmed.
    /// Segment offsets index into this string, counted in characters.
    pub fn normalized_text(&self) -> String {
        normalize_whitespace(&self.text)
    }
}

/// A contiguous window of a document's normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub document_id: String,
    /// Position of this segment within its document
    pub chunk_index: u32,
    /// Character offset of the first character (inclusive)
    pub start_offset: usize,
    /// Character offset past the last character (exclusive)
    pub end_offset: usize,
    pub content: String,
    /// Estimated source page, for documents extracted with page markers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Segment {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn new(
        document_id: &str,
        chunk_index: u32,
        start_offset: usize,
        end_offset: usize,
        content: String,
    ) -> Self {
        Self {
            id: Self::generate_id(document_id, chunk_index),
            document_id: document_id.to_string(),
            chunk_index,
            start_offset,
            end_offset,
            content,
            page: None,
        }
    }

    pub fn with_page(mut self, page: Option<u32>) -> Self {
        self.page = page;
        self
    }

    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}
