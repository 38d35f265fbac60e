//! tablegrid: Reconstruct ruled tables from PDF pages.
//!
//! Rebuilds the row/column grid of each page from its ruling lines, detects
//! merged cells from gaps in those rulings and places every text run in its
//! cell.
//!
//! # Architecture
//!
//! - **tablegrid-core**: Backend-independent data types and the reconstruction pipeline
//! - **tablegrid-parse**: PDF parsing and content stream interpretation
//! - **tablegrid** (this crate): Page driver and public API that ties everything together
//!
//! # Example
//!
//! ```ignore
//! let result = tablegrid::extract(&bytes, &ExtractOptions::default())?;
//! for table in &result.page_tables {
//!     println!("page {}: {} rows", table.page, table.height);
//! }
//! ```

mod document;
mod extract;

pub use document::TableDocument;
#[cfg(feature = "parallel")]
pub use extract::extract_parallel;
pub use extract::{extract, extract_with_progress};

pub use tablegrid_core::{
    CellKey, ExtractOptions, ExtractWarning, ExtractWarningCode, GridSettings, MergeAlias,
    MergeMap, MergeRegion, NoTableReason, PageContent, PageOutcome, PageReport, PdfError,
    PdfTableParseResult, Table,
};

pub use tablegrid_core;
pub use tablegrid_parse;
