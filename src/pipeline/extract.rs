//! Plain-text extraction from PDF bytes via `lopdf`.
//!
//! A document that cannot be parsed at all is an error. A page that parses
//! but yields no text (scanned image, unsupported font encoding) contributes
//! an empty string so one bad page never sinks the whole upload.

use crate::error::CourseError;
use lopdf::Document;
use tracing::{debug, warn};

/// Extract the text of every page, in page order, concatenated.
pub fn extract_text(pdf_bytes: &[u8]) -> Result<String, CourseError> {
    Ok(extract_pages(pdf_bytes)?.concat())
}

/// Extract the text of every page, in page order, one entry per page.
pub fn extract_pages(pdf_bytes: &[u8]) -> Result<Vec<String>, CourseError> {
    if pdf_bytes.is_empty() {
        return Err(CourseError::EmptyDocument);
    }

    let document =
        Document::load_mem(pdf_bytes).map_err(|e| CourseError::UnreadableDocument {
            detail: e.to_string(),
        })?;

    let pages = document.get_pages();
    debug!("PDF loaded: {} pages", pages.len());

    let texts = pages
        .keys()
        .map(|&page_num| match document.extract_text(&[page_num]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Page {}: no extractable text ({})", page_num, e);
                String::new()
            }
        })
        .collect();

    Ok(texts)
}
