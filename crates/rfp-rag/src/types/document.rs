//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect file type from a filename, failing on anything unrecognized.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        Self::from_extension(ext).ok_or_else(|| {
            if ext.is_empty() {
                Error::UnsupportedFileType(format!("'{}' has no extension", filename))
            } else {
                Error::UnsupportedFileType(format!(".{} ('{}')", ext, filename))
            }
        })
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
        }
    }
}

/// Start of a page inside the full text
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSpan {
    /// 1-indexed page number
    pub page_number: u32,
    /// Byte offset of the page's first character in the full text
    pub offset: usize,
}

/// The single loaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Filename as uploaded
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// SHA-256 of the full text
    pub content_hash: String,
    /// File size in bytes
    pub file_size: u64,
    /// Total number of pages (PDF only)
    pub total_pages: Option<u32>,
    /// Load timestamp
    pub loaded_at: chrono::DateTime<chrono::Utc>,
    /// Concatenation of all pages
    #[serde(skip)]
    pub full_text: String,
    /// Page boundaries, ascending by offset; empty for unpaged formats
    #[serde(skip)]
    pub pages: Vec<PageSpan>,
}

impl Document {
    /// Page containing the given byte offset, if the document is paged.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let idx = self.pages.partition_point(|p| p.offset <= offset);
        idx.checked_sub(1).map(|i| self.pages[i].page_number)
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Source filename
    pub filename: String,
    /// Page number (1-indexed, PDF only)
    pub page_number: Option<u32>,
    /// Byte offset of the chunk start in the full text
    pub start: usize,
    /// Byte offset one past the chunk end
    pub end: usize,
}

/// A retrieval chunk. Immutable once built; a reload replaces the whole set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Position in the document's chunk sequence
    pub position: usize,
    /// Chunk text
    pub content: String,
    /// Source information
    pub source: ChunkSource,
}

impl Chunk {
    /// Metadata object returned alongside query sources.
    pub fn metadata(&self) -> serde_json::Value {
        let mut meta = serde_json::json!({
            "source": self.source.filename,
            "chunk_index": self.position,
            "start_index": self.source.start,
        });
        if let Some(page) = self.source.page_number {
            meta["page"] = serde_json::json!(page);
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("rfp.PDF").unwrap(), FileType::Pdf);
        assert_eq!(FileType::from_filename("notes.md").unwrap(), FileType::Markdown);
        assert_eq!(FileType::from_filename("a.b.txt").unwrap(), FileType::Txt);
        assert!(matches!(
            FileType::from_filename("budget.xlsx"),
            Err(Error::UnsupportedFileType(_))
        ));
        assert!(FileType::from_filename("README").is_err());
    }

    #[test]
    fn test_page_at() {
        let doc = Document {
            id: Uuid::new_v4(),
            filename: "rfp.pdf".into(),
            file_type: FileType::Pdf,
            content_hash: String::new(),
            file_size: 0,
            total_pages: Some(3),
            loaded_at: chrono::Utc::now(),
            full_text: String::new(),
            pages: vec![
                PageSpan { page_number: 1, offset: 0 },
                PageSpan { page_number: 2, offset: 100 },
                PageSpan { page_number: 3, offset: 250 },
            ],
        };
        assert_eq!(doc.page_at(0), Some(1));
        assert_eq!(doc.page_at(99), Some(1));
        assert_eq!(doc.page_at(100), Some(2));
        assert_eq!(doc.page_at(999), Some(3));
    }
}
