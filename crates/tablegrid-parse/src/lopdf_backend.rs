//! Document access through lopdf.
//!
//! [`LopdfBackend`] loads the file, flattens the page tree into an index and
//! hands each page's content stream to the interpreter together with the
//! page's (possibly inherited) resources.

use std::sync::LazyLock;

use tablegrid_core::{ExtractOptions, PdfError};

use crate::backend::PdfBackend;
use crate::error::BackendError;
use crate::handler::ContentHandler;
use crate::interpreter::{decode_stream, interpret_content_stream, resolve};

/// Longest `/Parent` chain followed when looking up inherited page attributes.
const MAX_TREE_DEPTH: usize = 64;

static NO_RESOURCES: LazyLock<lopdf::Dictionary> = LazyLock::new(lopdf::Dictionary::new);

/// An opened PDF file.
pub struct LopdfDocument {
    inner: lopdf::Document,
    /// Page object ids in reading order.
    page_ids: Vec<lopdf::ObjectId>,
}

impl LopdfDocument {
    /// The lopdf document, for callers that need raw object access.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

/// Handle to one page of a [`LopdfDocument`].
#[derive(Debug, Clone, Copy)]
pub struct LopdfPage {
    pub object_id: lopdf::ObjectId,
    /// 0-based position in the document.
    pub index: usize,
}

/// [`PdfBackend`] over lopdf.
///
/// ```ignore
/// use tablegrid_parse::{LopdfBackend, PdfBackend};
///
/// let doc = LopdfBackend::open(&bytes)?;
/// for index in 0..LopdfBackend::page_count(&doc) {
///     let page = LopdfBackend::get_page(&doc, index)?;
///     LopdfBackend::interpret_page(&doc, &page, &mut handler, &options)?;
/// }
/// ```
pub struct LopdfBackend;

fn malformed(what: &str, err: impl std::fmt::Display) -> BackendError {
    BackendError::Parse(format!("{what}: {err}"))
}

fn page_dict(doc: &lopdf::Document, id: lopdf::ObjectId) -> Result<&lopdf::Dictionary, BackendError> {
    doc.get_object(id)
        .and_then(|o| o.as_dict())
        .map_err(|e| malformed("page object is not a dictionary", e))
}

/// Value of `key` on the page or, failing that, on the nearest ancestor
/// node of the page tree that sets it.
fn inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: lopdf::ObjectId,
    key: &[u8],
) -> Result<Option<&'a lopdf::Object>, BackendError> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = page_dict(doc, node_id)?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(value));
        }
        let Ok(parent) = node.get(b"Parent") else {
            return Ok(None);
        };
        node_id = parent
            .as_reference()
            .map_err(|e| malformed("/Parent is not a reference", e))?;
    }
    tracing::debug!(?page_id, depth = MAX_TREE_DEPTH, "page tree too deep, attribute not found");
    Ok(None)
}

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;
    type Page = LopdfPage;
    type Error = BackendError;

    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error> {
        let inner = lopdf::Document::load_mem(bytes).map_err(|e| malformed("not a readable PDF", e))?;
        if inner.is_encrypted() {
            return Err(BackendError::Core(PdfError::PasswordRequired));
        }

        // keyed by 1-based page number, so values come out in order
        let page_ids: Vec<lopdf::ObjectId> = inner.get_pages().into_values().collect();
        tracing::debug!(pages = page_ids.len(), "document opened");
        Ok(LopdfDocument { inner, page_ids })
    }

    fn page_count(doc: &Self::Document) -> usize {
        doc.page_ids.len()
    }

    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error> {
        match doc.page_ids.get(index) {
            Some(&object_id) => Ok(LopdfPage { object_id, index }),
            None => Err(BackendError::Parse(format!(
                "no page {index}, document has {}",
                doc.page_ids.len()
            ))),
        }
    }

    fn interpret_page(
        doc: &Self::Document,
        page: &Self::Page,
        handler: &mut dyn ContentHandler,
        options: &ExtractOptions,
    ) -> Result<(), Self::Error> {
        let inner = &doc.inner;
        let content = page_content_bytes(inner, page_dict(inner, page.object_id)?)?;
        let resources = page_resources(inner, page.object_id)?;
        tracing::trace!(page = page.index + 1, bytes = content.len(), "interpreting page");
        interpret_content_stream(inner, &content, resources, handler, options)
    }
}

/// Decoded `/Contents` of a page. A page without contents is blank.
///
/// `/Contents` may be one stream or an array of streams, directly or behind a
/// reference; array parts are joined with a space so tokens cannot fuse.
fn page_content_bytes(
    doc: &lopdf::Document,
    page: &lopdf::Dictionary,
) -> Result<Vec<u8>, BackendError> {
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    match resolve(doc, contents) {
        lopdf::Object::Array(parts) => {
            let mut joined = Vec::new();
            for part in parts {
                let stream = resolve(doc, part)
                    .as_stream()
                    .map_err(|e| malformed("/Contents part is not a stream", e))?;
                if !joined.is_empty() {
                    joined.push(b' ');
                }
                joined.extend(decode_content(stream)?);
            }
            Ok(joined)
        }
        lopdf::Object::Stream(stream) => decode_content(stream),
        _ => Err(BackendError::Parse(
            "/Contents must be a stream or an array of streams".to_string(),
        )),
    }
}

fn decode_content(stream: &lopdf::Stream) -> Result<Vec<u8>, BackendError> {
    decode_stream(stream).map_err(|e| malformed("undecodable content stream", e))
}

/// The page's `/Resources`, inherited if needed; empty when none is set.
fn page_resources(
    doc: &lopdf::Document,
    page_id: lopdf::ObjectId,
) -> Result<&lopdf::Dictionary, BackendError> {
    match inherited(doc, page_id, b"Resources")? {
        Some(value) => resolve(doc, value)
            .as_dict()
            .map_err(|e| malformed("/Resources is not a dictionary", e)),
        None => Ok(&*NO_RESOURCES),
    }
}
