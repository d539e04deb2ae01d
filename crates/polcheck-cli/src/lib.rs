//! # polcheck-cli: Command-Line Compliance Checks
//!
//! Provides the `polcheck` binary for working with policy files locally,
//! without the HTTP service or its store.
//!
//! ## Subcommands
//!
//! - `polcheck extract` : print the text extracted from a PDF, exactly as
//!   it would be stored on upload.
//! - `polcheck check` : check a document against one or more policy files
//!   with the substring evaluator or the hosted model.
//!
//! ```bash
//! polcheck extract handbook.pdf
//! polcheck check --policy refunds.pdf --policy tone.pdf --document reply.txt
//! polcheck check --policy refunds.pdf --text "No refunds." --mode prompt --json
//! ```
//!
//! ## Exit codes
//!
//! `0` compliant (or extraction succeeded), `2` non-compliant, `1` error.

pub mod check;
pub mod extract;

use std::path::Path;

use anyhow::Context;
use polcheck_extract::{PdfTextExtractor, TextExtractor, Utf8TextExtractor};

/// Exit code for a successful command or a compliant document.
pub const EXIT_OK: u8 = 0;

/// Exit code for a document with at least one violation.
pub const EXIT_NON_COMPLIANT: u8 = 2;

/// Pick an extractor by file extension: `.pdf` goes through the PDF text
/// layer, anything else is read as UTF-8 text.
pub fn extractor_for(path: &Path) -> Box<dyn TextExtractor> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Box::new(PdfTextExtractor::new())
    } else {
        Box::new(Utf8TextExtractor)
    }
}

/// Read `path` and extract its text with [`extractor_for`].
pub fn read_text(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let extractor = extractor_for(path);
    let text = extractor
        .extract(&bytes)
        .with_context(|| format!("failed to extract text from {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        extractor = extractor.name(),
        chars = text.chars().count(),
        "extracted text"
    );
    Ok(text)
}
