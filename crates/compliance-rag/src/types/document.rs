//! Document and reference chunk types

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Filing documents the checker accepts
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Pdf | Self::Docx)
    }

    /// Only DOCX inputs get an annotated copy
    pub fn supports_annotation(&self) -> bool {
        matches!(self, Self::Docx)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Unknown => "Unknown",
        }
    }
}

/// Text extracted from a filing or reference document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Detected file type
    pub file_type: FileType,
    /// Extracted text
    pub content: String,
    /// SHA-256 of the extracted text
    pub content_hash: String,
}

/// A fragment of a reference document stored in the vector index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceChunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Chunk text
    pub text: String,
    /// Processed file stem the chunk came from
    pub source: String,
    /// Reference category (folder the original lived in)
    pub category: String,
    /// Embedding vector; empty when returned from a search
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl ReferenceChunk {
    /// Create a chunk without an embedding
    pub fn new(text: impl Into<String>, source: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            source: source.into(),
            category: category.into(),
            embedding: Vec::new(),
        }
    }

    /// Attach an embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Copy without the embedding payload
    pub fn without_embedding(&self) -> Self {
        Self {
            id: self.id,
            text: self.text.clone(),
            source: self.source.clone(),
            category: self.category.clone(),
            embedding: Vec::new(),
        }
    }
}
