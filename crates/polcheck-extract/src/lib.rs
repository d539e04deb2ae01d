//! # polcheck-extract: Document Text Extraction
//!
//! Defines the [`TextExtractor`] seam between raw uploaded bytes and the
//! plain text that gets stored as a policy. Two implementations:
//!
//! - [`PdfTextExtractor`]: PDF text layer via the `pdf-extract` crate.
//!   Scanned (image-only) PDFs yield little or no text; no OCR is attempted.
//! - [`Utf8TextExtractor`]: treats the bytes as UTF-8 text. Used for plain
//!   text documents on the command line and as a deterministic stand-in in
//!   tests.
//!
//! Extraction is CPU-bound and synchronous. Async callers should run it on
//! the blocking pool.

use std::panic::{self, AssertUnwindSafe};

/// Errors from text extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// No bytes were supplied.
    #[error("document is empty")]
    Empty,

    /// The bytes could not be parsed as the expected document format.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Converts raw document bytes into plain text.
///
/// Implementations must be `Send + Sync` so a single instance can be shared
/// across request handlers behind an `Arc`. The trait is object-safe.
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from `bytes`.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;

    /// Human-readable name, used in logs.
    fn name(&self) -> &str;
}

/// PDF text extraction backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }

        // pdf-extract panics on some malformed inputs instead of returning Err.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        match outcome {
            Ok(Ok(text)) => {
                tracing::debug!(bytes = bytes.len(), chars = text.len(), "extracted PDF text");
                Ok(text)
            }
            Ok(Err(e)) => Err(ExtractionError::Malformed(e.to_string())),
            Err(_) => Err(ExtractionError::Malformed(
                "PDF parser aborted on malformed input".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "pdf-extract"
    }
}

/// Passthrough extractor for documents that are already plain UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8TextExtractor;

impl TextExtractor for Utf8TextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractionError::Malformed(format!("not UTF-8 text: {e}")))
    }

    fn name(&self) -> &str {
        "utf-8"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_rejects_empty_input() {
        assert!(matches!(
            PdfTextExtractor::new().extract(&[]),
            Err(ExtractionError::Empty)
        ));
    }

    #[test]
    fn pdf_rejects_non_pdf_bytes() {
        let result = PdfTextExtractor::new().extract(b"this is not a pdf");
        assert!(matches!(result, Err(ExtractionError::Malformed(_))));
    }

    #[test]
    fn pdf_rejects_truncated_header() {
        let result = PdfTextExtractor::new().extract(b"%PDF-1.4\n");
        assert!(result.is_err());
    }

    #[test]
    fn utf8_passthrough() {
        let text = Utf8TextExtractor.extract("No refunds after 30 days".as_bytes()).unwrap();
        assert_eq!(text, "No refunds after 30 days");
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        assert!(matches!(
            Utf8TextExtractor.extract(&[0xff, 0xfe, 0x00]),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn utf8_rejects_empty() {
        assert!(matches!(Utf8TextExtractor.extract(b""), Err(ExtractionError::Empty)));
    }

    #[test]
    fn extractors_are_object_safe() {
        let extractors: Vec<Box<dyn TextExtractor>> =
            vec![Box::new(PdfTextExtractor::new()), Box::new(Utf8TextExtractor)];
        let names: Vec<&str> = extractors.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["pdf-extract", "utf-8"]);
    }
}
