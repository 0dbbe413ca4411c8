//! Text and PDF loading

use sha2::{Digest, Sha256};
use std::sync::mpsc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{FileType, PageSpan};

/// Upper bound on whole-document PDF extraction
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text pulled out of an uploaded file
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub file_type: FileType,
    /// All pages joined by a blank line
    pub full_text: String,
    /// Page starts inside `full_text` (PDF only)
    pub pages: Vec<PageSpan>,
    /// Page count reported by the PDF
    pub total_pages: Option<u32>,
}

impl ParsedDocument {
    /// SHA-256 of the full text, hex encoded
    pub fn content_hash(&self) -> String {
        hash_content(&self.full_text)
    }
}

/// Format-dispatching file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension.
    ///
    /// Fails with `UnsupportedFileType` for anything but text, markdown and PDF,
    /// and with `EmptyDocument` when nothing readable comes out.
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename)?;

        let parsed = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Txt | FileType::Markdown => Self::parse_text(data, file_type),
        };

        if parsed.full_text.trim().is_empty() {
            return Err(Error::EmptyDocument(filename.to_string()));
        }

        tracing::debug!(
            filename,
            file_type = file_type.display_name(),
            chars = parsed.full_text.chars().count(),
            pages = ?parsed.total_pages,
            "Parsed document"
        );
        Ok(parsed)
    }

    fn parse_text(data: &[u8], file_type: FileType) -> ParsedDocument {
        ParsedDocument {
            file_type,
            full_text: String::from_utf8_lossy(data).into_owned(),
            pages: Vec::new(),
            total_pages: None,
        }
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let total_pages = Some(page_numbers.len() as u32);

        let mut full_text = String::new();
        let mut pages = Vec::new();
        for page_number in page_numbers {
            let text = match doc.extract_text(&[page_number]) {
                Ok(text) => clean_pdf_text(&text),
                Err(e) => {
                    tracing::debug!("No text for page {} of {}: {}", page_number, filename, e);
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }
            if !full_text.is_empty() {
                full_text.push_str("\n\n");
            }
            pages.push(PageSpan {
                page_number,
                offset: full_text.len(),
            });
            full_text.push_str(&text);
        }

        if full_text.is_empty() {
            tracing::warn!("Per-page extraction found no text in {}, trying pdf-extract", filename);
            full_text = clean_pdf_text(&Self::extract_whole_pdf(filename, data)?);
            pages = vec![PageSpan {
                page_number: 1,
                offset: 0,
            }];
        }

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            full_text,
            pages,
            total_pages,
        })
    }

    /// Whole-document extraction on a helper thread; some fonts make pdf-extract hang.
    fn extract_whole_pdf(filename: &str, data: &[u8]) -> Result<String> {
        let bytes = data.to_vec();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(pdf_extract::extract_text_from_mem(&bytes));
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::file_parse(filename, e.to_string())),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Error::file_parse(
                filename,
                format!("PDF extraction timed out after {}s", PDF_EXTRACT_TIMEOUT.as_secs()),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::file_parse(filename, "PDF extraction thread panicked"))
            }
        }
    }
}

/// Normalize typographic characters and drop blank lines from extracted PDF text
fn clean_pdf_text(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\u{2010}' | '\u{2011}' | '\u{2013}' => normalized.push('-'),
            '\u{2018}' | '\u{2019}' => normalized.push('\''),
            '\u{201C}' | '\u{201D}' => normalized.push('"'),
            '\u{00A0}' => normalized.push(' '),
            '\u{FB00}' => normalized.push_str("ff"),
            '\u{FB01}' => normalized.push_str("fi"),
            '\u{FB02}' => normalized.push_str("fl"),
            '\u{FB03}' => normalized.push_str("ffi"),
            '\u{FB04}' => normalized.push_str("ffl"),
            _ => normalized.push(c),
        }
    }

    normalized
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hash content for change detection
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
