//! PDF parsing backend trait.
//!
//! Defines the [`PdfBackend`] trait that abstracts how a document is opened
//! and how a page's content is turned into handler callbacks.

use tablegrid_core::{ExtractOptions, PdfError};

use crate::handler::ContentHandler;

/// Trait abstracting PDF parsing operations.
///
/// A backend opens a document, hands out pages by index and interprets a
/// page's content streams through a [`ContentHandler`].
///
/// # Usage
///
/// ```ignore
/// let doc = MyBackend::open(pdf_bytes)?;
/// let page_count = MyBackend::page_count(&doc);
/// let page = MyBackend::get_page(&doc, 0)?;
/// MyBackend::interpret_page(&doc, &page, &mut handler, &options)?;
/// ```
pub trait PdfBackend {
    /// The parsed PDF document type.
    type Document;

    /// A reference to a single page within a document.
    type Page;

    /// Backend-specific error type, convertible to [`PdfError`].
    type Error: std::error::Error + Into<PdfError>;

    /// Parse PDF bytes into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not represent a readable PDF document.
    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error>;

    /// Return the number of pages in the document.
    fn page_count(doc: &Self::Document) -> usize;

    /// Access a page by 0-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error>;

    /// Interpret the page's content streams, reporting drawing operations,
    /// text runs and warnings to `handler`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page's content cannot be read or tokenized.
    fn interpret_page(
        doc: &Self::Document,
        page: &Self::Page,
        handler: &mut dyn ContentHandler,
        options: &ExtractOptions,
    ) -> Result<(), Self::Error>;
}
