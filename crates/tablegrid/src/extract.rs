//! One-call extraction over raw PDF bytes.

use tablegrid_core::{ExtractOptions, PdfError, PdfTableParseResult};

use crate::TableDocument;

/// Reconstruct the tables of every page of a PDF.
///
/// # Errors
///
/// Returns [`PdfError`] if the document cannot be opened. Pages without a
/// table never fail the extraction.
pub fn extract(bytes: &[u8], options: &ExtractOptions) -> Result<PdfTableParseResult, PdfError> {
    TableDocument::open(bytes, Some(options.clone()))?.extract()
}

/// Like [`extract`], calling `progress` with the result so far after each page.
///
/// # Errors
///
/// Returns [`PdfError`] if the document cannot be opened.
pub fn extract_with_progress<F>(
    bytes: &[u8],
    options: &ExtractOptions,
    progress: F,
) -> Result<PdfTableParseResult, PdfError>
where
    F: FnMut(&PdfTableParseResult),
{
    TableDocument::open(bytes, Some(options.clone()))?.extract_with_progress(progress)
}

/// Like [`extract_with_progress`], processing pages concurrently.
///
/// # Errors
///
/// Returns [`PdfError`] if the document cannot be opened.
#[cfg(feature = "parallel")]
pub fn extract_parallel<F>(
    bytes: &[u8],
    options: &ExtractOptions,
    progress: F,
) -> Result<PdfTableParseResult, PdfError>
where
    F: FnMut(&PdfTableParseResult),
{
    TableDocument::open(bytes, Some(options.clone()))?.extract_parallel(progress)
}
