//! tablegrid-core: Backend-independent grid reconstruction for ruled tables.
//!
//! Takes the operator stream and text stream of a page (see [`PageContent`])
//! and rebuilds the table drawn on it:
//!
//! 1. [`extract_edges`] turns thin rectangles and stroked segments into ruling edges,
//! 2. [`build_grid`] clusters edges into column and row grid lines with coverage,
//! 3. [`detect_merges`] infers merged cells from gaps in that coverage,
//! 4. [`map_text_to_cells`] drops every text run into its cell.
//!
//! [`reconstruct_page`] runs all four. Nothing here parses PDF; see
//! `tablegrid-parse` for producing [`PageContent`] from a document.

pub mod cells;
pub mod content;
pub mod edges;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod merge;
pub mod settings;
pub mod table;

pub use cells::map_text_to_cells;
pub use content::{DrawOp, PageContent, PaintOp, PathOp, TextRun};
pub use edges::{Edge, EdgeExtraction, EdgeLimitExceeded, extract_edges};
pub use error::{ExtractWarning, ExtractWarningCode, PdfError};
pub use geometry::{Ctm, Point};
pub use grid::{
    GridFailure, GridLine, GridLines, Interval, build_grid, build_horizontals, build_verticals,
};
pub use merge::{
    CellKey, MergeAlias, MergeLayout, MergeMap, MergeRegion, ParseCellKeyError, detect_merges,
};
pub use settings::{ExtractOptions, GridSettings};
pub use table::{
    NoTableReason, PageOutcome, PageReport, PdfTableParseResult, Table, reconstruct_page,
};
