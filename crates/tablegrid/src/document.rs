//! Top-level document type for reconstructing tables page by page.

use tablegrid_core::{
    DrawOp, ExtractOptions, ExtractWarning, ExtractWarningCode, NoTableReason, PageContent,
    PageReport, PdfError, PdfTableParseResult, Table, TextRun, reconstruct_page,
};
use tablegrid_parse::{ContentHandler, LopdfBackend, LopdfDocument, PdfBackend};

/// Internal handler that collects a page's operator and text streams.
struct CollectingHandler {
    page_number: usize,
    collect_warnings: bool,
    ops: Vec<DrawOp>,
    text_runs: Vec<TextRun>,
    warnings: Vec<ExtractWarning>,
}

impl CollectingHandler {
    fn new(page_number: usize, collect_warnings: bool) -> Self {
        Self {
            page_number,
            collect_warnings,
            ops: Vec::new(),
            text_runs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn into_parts(self) -> (PageContent, Vec<ExtractWarning>) {
        (
            PageContent::new(self.page_number, self.ops, self.text_runs),
            self.warnings,
        )
    }
}

impl ContentHandler for CollectingHandler {
    fn on_draw_op(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    fn on_text_run(&mut self, run: TextRun) {
        self.text_runs.push(run);
    }

    fn on_warning(&mut self, mut warning: ExtractWarning) {
        if self.collect_warnings {
            if warning.page.is_none() {
                warning.page = Some(self.page_number);
            }
            self.warnings.push(warning);
        }
    }
}

/// A PDF document opened for table extraction.
///
/// # Example
///
/// ```ignore
/// let doc = TableDocument::open(bytes, None)?;
/// if let Some(table) = doc.page_table(0)? {
///     println!("{} x {}", table.height, table.width);
/// }
/// ```
#[derive(Debug)]
pub struct TableDocument {
    doc: LopdfDocument,
    options: ExtractOptions,
}

impl TableDocument {
    /// Read and open the PDF at `path`.
    ///
    /// # Errors
    ///
    /// [`PdfError::IoError`] if the file cannot be read, otherwise as [`TableDocument::open`].
    pub fn open_file(
        path: impl AsRef<std::path::Path>,
        options: Option<ExtractOptions>,
    ) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| PdfError::IoError(e.to_string()))?;
        Self::open(&bytes, options)
    }

    /// Open a PDF held in memory. `None` options means the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::ResourceLimitExceeded`] if the input is larger than
    /// `max_input_bytes`, [`PdfError::PasswordRequired`] if the PDF is
    /// encrypted and [`PdfError::ParseError`] if the bytes are not a valid PDF.
    pub fn open(bytes: &[u8], options: Option<ExtractOptions>) -> Result<Self, PdfError> {
        let options = options.unwrap_or_default();
        if let Some(max_bytes) = options.max_input_bytes {
            if bytes.len() > max_bytes {
                return Err(PdfError::ResourceLimitExceeded {
                    limit_name: "max_input_bytes".to_string(),
                    limit_value: max_bytes,
                    actual_value: bytes.len(),
                });
            }
        }
        let doc = LopdfBackend::open(bytes).map_err(PdfError::from)?;
        Ok(Self { doc, options })
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        LopdfBackend::page_count(&self.doc)
    }

    fn collect(&self, index: usize) -> Result<CollectingHandler, PdfError> {
        let page = LopdfBackend::get_page(&self.doc, index).map_err(PdfError::from)?;
        let mut handler = CollectingHandler::new(index + 1, self.options.collect_warnings);
        LopdfBackend::interpret_page(&self.doc, &page, &mut handler, &self.options)
            .map_err(PdfError::from)?;
        Ok(handler)
    }

    /// The operator stream and text stream of the page at 0-based `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the index is out of range or the page's
    /// content cannot be interpreted.
    pub fn page_content(&self, index: usize) -> Result<PageContent, PdfError> {
        self.collect(index).map(|handler| handler.into_parts().0)
    }

    /// Reconstruct the page at 0-based `index`.
    ///
    /// Content that cannot be interpreted yields an empty page with
    /// [`NoTableReason::UnreadableContent`] and a warning, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the index is out of range.
    pub fn page_report(&self, index: usize) -> Result<PageReport, PdfError> {
        let page = LopdfBackend::get_page(&self.doc, index).map_err(PdfError::from)?;
        let page_number = index + 1;
        let mut handler = CollectingHandler::new(page_number, self.options.collect_warnings);

        if let Err(err) = LopdfBackend::interpret_page(&self.doc, &page, &mut handler, &self.options)
        {
            tracing::warn!(page = page_number, %err, "page content could not be interpreted");
            let mut report = PageReport::empty(page_number, NoTableReason::UnreadableContent);
            report.warnings = handler.warnings;
            report.warnings.push(
                ExtractWarning::with_code(
                    ExtractWarningCode::Other("UNREADABLE_CONTENT".to_string()),
                    err.to_string(),
                )
                .on_page(page_number),
            );
            return Ok(report);
        }

        let (content, mut warnings) = handler.into_parts();
        let mut report = reconstruct_page(&content, &self.options.grid_settings());
        // interpreter warnings precede the pipeline's own
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    /// The table of the page at 0-based `index`, if it has one.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the index is out of range.
    pub fn page_table(&self, index: usize) -> Result<Option<Table>, PdfError> {
        Ok(self.page_report(index)?.outcome.into_table())
    }

    /// Reconstruct every page in order.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] only for document-level failures; pages without a
    /// table are recorded and processing continues.
    pub fn extract(&self) -> Result<PdfTableParseResult, PdfError> {
        self.extract_with_progress(|_| {})
    }

    /// Reconstruct every page in order, calling `progress` with the result so
    /// far after each page.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] only for document-level failures.
    pub fn extract_with_progress<F>(&self, mut progress: F) -> Result<PdfTableParseResult, PdfError>
    where
        F: FnMut(&PdfTableParseResult),
    {
        let mut result = PdfTableParseResult::new(self.page_count());
        for index in 0..self.page_count() {
            let report = self.page_report(index)?;
            result.record(report, self.options.collect_warnings);
            progress(&result);
        }
        tracing::debug!(
            pages = result.num_pages,
            tables = result.page_tables.len(),
            "extraction finished"
        );
        Ok(result)
    }

    /// Reconstruct all pages concurrently using rayon.
    ///
    /// Pages are recorded, and `progress` is called, strictly in page order
    /// regardless of which page finishes first.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] only for document-level failures.
    #[cfg(feature = "parallel")]
    pub fn extract_parallel<F>(&self, mut progress: F) -> Result<PdfTableParseResult, PdfError>
    where
        F: FnMut(&PdfTableParseResult),
    {
        use rayon::prelude::*;

        let reports: Vec<Result<PageReport, PdfError>> = (0..self.page_count())
            .into_par_iter()
            .map(|index| self.page_report(index))
            .collect();

        let mut result = PdfTableParseResult::new(reports.len());
        for report in reports {
            result.record(report?, self.options.collect_warnings);
            progress(&result);
        }
        Ok(result)
    }
}
