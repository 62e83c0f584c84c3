use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use lopdf::Document;

use crate::error::{AppError, AppResult};
use crate::models::ExtractedText;

/// Pulls plain text out of a staged PDF, page by page.
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Reads the document at `path` and concatenates the text of every page
    /// in document order.
    ///
    /// A zero-byte file is a document with no pages. Pages without text
    /// contribute nothing; an unparsable document is `CorruptDocument`.
    pub fn extract(&self, path: &Path) -> AppResult<ExtractedText> {
        let start = Instant::now();

        let content = std::fs::read(path).map_err(|e| AppError::internal(format!(
            "staged document could not be read: {}",
            e
        )))?;

        let extracted = self.extract_from_bytes(&content)?;

        tracing::info!(
            pages = extracted.pages,
            text_length = extracted.text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "PDF text extraction completed"
        );
        Ok(extracted)
    }

    pub fn extract_from_bytes(&self, content: &[u8]) -> AppResult<ExtractedText> {
        if content.is_empty() {
            tracing::debug!("Empty document, nothing to extract");
            return Ok(ExtractedText::empty());
        }

        let doc = Document::load_mem(content).map_err(|e| {
            tracing::warn!("PDF structure could not be parsed: {}", e);
            AppError::corrupt_document(e.to_string())
        })?;

        let page_texts = extract_pages_lopdf(&doc);
        let pages = page_texts.len();
        let mut extracted = ExtractedText {
            text: join_pages(&page_texts),
            pages,
        };

        if pages > 0 && !extracted.has_content() {
            tracing::debug!("lopdf found no text, retrying with pdf-extract");
            match extract_pages_fallback(content) {
                Ok(fallback) if fallback.iter().any(|p| p.chars().any(|c| !c.is_whitespace())) => {
                    tracing::info!(pages = fallback.len(), "pdf-extract recovered text lopdf missed");
                    extracted.text = join_pages(&fallback);
                }
                Ok(_) => tracing::debug!("Document has no extractable text"),
                Err(e) => tracing::debug!("pdf-extract fallback failed: {}", e),
            }
        }

        Ok(extracted)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_pages_lopdf(doc: &Document) -> Vec<String> {
    // get_pages is keyed by page number, so iteration is document order.
    doc.get_pages()
        .into_keys()
        .map(|page_number| match doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(page = page_number, "Page text could not be extracted: {}", e);
                String::new()
            }
        })
        .collect()
}

// pdf-extract panics on some malformed input instead of returning an error.
fn extract_pages_fallback(content: &[u8]) -> Result<Vec<String>, String> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(content)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("pdf-extract panicked on malformed document".to_string()),
    }
}

/// Concatenates page texts, making sure each page starts on a new line.
fn join_pages(pages: &[String]) -> String {
    let mut text = String::with_capacity(pages.iter().map(String::len).sum::<usize>() + pages.len());
    for page in pages {
        if !text.is_empty() && !text.ends_with('\n') && !page.is_empty() {
            text.push('\n');
        }
        text.push_str(page);
    }
    text
}
