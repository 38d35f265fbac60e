//! Per-page table reconstruction and the document-level result.
//!
//! [`reconstruct_page`] runs the whole pipeline over one page's content:
//! edge extraction, grid line construction, merge detection and cell
//! mapping. It never fails; a page without a table reports why.

use crate::cells::map_text_to_cells;
use crate::content::PageContent;
use crate::edges::extract_edges;
use crate::error::{ExtractWarning, ExtractWarningCode};
use crate::grid::{GridFailure, build_grid};
use crate::merge::{CellKey, MergeAlias, MergeMap, MergeRegion, detect_merges};
use crate::settings::GridSettings;

/// A reconstructed table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    /// 1-based page number the table was found on.
    pub page: usize,
    /// Cell text, `rows[row][col]`. Non-anchor cells of a merge region are empty.
    pub rows: Vec<Vec<String>>,
    pub merges: MergeMap,
    pub merge_alias: MergeAlias,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Table {
    /// Text of the cell at `(row, col)`, as stored.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// The cell holding the content for `(row, col)`: its merge anchor, or itself.
    pub fn anchor_of(&self, row: usize, col: usize) -> CellKey {
        let key = CellKey::new(row, col);
        self.merge_alias.get(&key).copied().unwrap_or(key)
    }

    /// The merge region covering `(row, col)`, if any.
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergeRegion> {
        self.merges.get(&self.anchor_of(row, col))
    }
}

/// Why a page produced no table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NoTableReason {
    /// The page had more edges than allowed.
    EdgeLimit,
    /// No vertical grid line was found.
    NoColumns,
    /// No horizontal grid line was found.
    NoRows,
    /// Grid lines were found but enclose no row.
    EmptyGrid,
    /// The page's content could not be read.
    UnreadableContent,
}

/// Result of reconstructing one page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageOutcome {
    Table(Table),
    NoTable(NoTableReason),
}

impl PageOutcome {
    pub fn table(&self) -> Option<&Table> {
        match self {
            PageOutcome::Table(t) => Some(t),
            PageOutcome::NoTable(_) => None,
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            PageOutcome::Table(t) => Some(t),
            PageOutcome::NoTable(_) => None,
        }
    }
}

/// Outcome of one page plus the anomalies absorbed while processing it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageReport {
    /// 1-based page number.
    pub page: usize,
    pub outcome: PageOutcome,
    pub warnings: Vec<ExtractWarning>,
}

impl PageReport {
    /// A page that yielded nothing because of `reason`.
    pub fn empty(page: usize, reason: NoTableReason) -> Self {
        Self {
            page,
            outcome: PageOutcome::NoTable(reason),
            warnings: Vec::new(),
        }
    }
}

/// Reconstruct the table of one page.
pub fn reconstruct_page(content: &PageContent, settings: &GridSettings) -> PageReport {
    let page = content.page;

    let extraction = match extract_edges(&content.ops, settings) {
        Ok(extraction) => extraction,
        Err(err) => {
            tracing::warn!(page, %err, "edge limit reached, skipping page");
            let mut report = PageReport::empty(page, NoTableReason::EdgeLimit);
            report.warnings.push(
                ExtractWarning::with_code(ExtractWarningCode::ResourceLimitReached, err.to_string())
                    .on_page(page),
            );
            return report;
        }
    };
    let warnings: Vec<ExtractWarning> = extraction
        .warnings
        .into_iter()
        .map(|w| w.on_page(page))
        .collect();
    tracing::debug!(page, edges = extraction.edges.len(), "edges extracted");

    let grid = match build_grid(&extraction.edges, settings) {
        Ok(grid) => grid,
        Err(failure) => {
            let reason = match failure {
                GridFailure::NoColumns => NoTableReason::NoColumns,
                GridFailure::NoRows => NoTableReason::NoRows,
            };
            tracing::debug!(page, ?reason, "no table on page");
            return PageReport {
                page,
                outcome: PageOutcome::NoTable(reason),
                warnings,
            };
        }
    };
    tracing::debug!(
        page,
        verticals = grid.verticals.len(),
        horizontals = grid.horizontals.len(),
        "grid lines built"
    );

    let layout = detect_merges(grid, settings);
    let width = layout.grid.column_count();
    let height = layout.grid.row_count();
    // a single column boundary still delimits rows; only a missing row is empty
    if height == 0 {
        tracing::debug!(page, width, height, "grid encloses no row");
        return PageReport {
            page,
            outcome: PageOutcome::NoTable(NoTableReason::EmptyGrid),
            warnings,
        };
    }

    let rows = map_text_to_cells(&content.text_runs, &layout.grid, &layout.merge_alias, settings);

    PageReport {
        page,
        outcome: PageOutcome::Table(Table {
            page,
            rows,
            merges: layout.merges,
            merge_alias: layout.merge_alias,
            width,
            height,
        }),
        warnings,
    }
}

/// Aggregated result of a document.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PdfTableParseResult {
    /// One table per page that produced one, in page order.
    pub page_tables: Vec<Table>,
    pub num_pages: usize,
    /// Pages processed so far.
    pub current_pages: usize,
    /// Per-page anomalies absorbed along the way.
    pub warnings: Vec<ExtractWarning>,
}

impl PdfTableParseResult {
    pub fn new(num_pages: usize) -> Self {
        Self {
            num_pages,
            ..Self::default()
        }
    }

    /// Fold one processed page into the result.
    ///
    /// Pages must be recorded in page order. Every page counts towards
    /// `current_pages`; only tables with at least one row are kept.
    pub fn record(&mut self, report: PageReport, collect_warnings: bool) {
        self.current_pages += 1;
        if collect_warnings {
            self.warnings.extend(report.warnings);
        }
        if let PageOutcome::Table(table) = report.outcome {
            if table.height > 0 {
                self.page_tables.push(table);
            }
        }
    }

    /// Whether every page has been processed.
    pub fn is_complete(&self) -> bool {
        self.current_pages >= self.num_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DrawOp, PaintOp, PathOp, TextRun};

    /// Thin filled rectangle.
    fn rule(x: f64, y: f64, width: f64, height: f64) -> DrawOp {
        DrawOp::ConstructPath(vec![PathOp::Rectangle {
            x,
            y,
            width,
            height,
        }])
    }

    fn vrule(x: f64, y0: f64, y1: f64) -> DrawOp {
        rule(x, y0, 1.0, y1 - y0)
    }

    fn hrule(y: f64, x0: f64, x1: f64) -> DrawOp {
        rule(x0, y, x1 - x0, 1.0)
    }

    fn page(ops: Vec<DrawOp>, runs: Vec<TextRun>) -> PageContent {
        PageContent::new(1, ops, runs)
    }

    fn table_of(report: PageReport) -> Table {
        match report.outcome {
            PageOutcome::Table(t) => t,
            PageOutcome::NoTable(reason) => panic!("expected a table, got {reason:?}"),
        }
    }

    fn two_by_two(top_interior_vertical: bool) -> Vec<DrawOp> {
        let mut ops = vec![
            vrule(100.0, 100.0, 300.0),
            vrule(300.0, 100.0, 300.0),
            hrule(100.0, 100.0, 300.0),
            hrule(200.0, 100.0, 300.0),
            hrule(300.0, 100.0, 300.0),
            vrule(200.0, 100.0, 200.0),
        ];
        if top_interior_vertical {
            ops.push(vrule(200.0, 200.0, 300.0));
        }
        ops.push(DrawOp::Paint(PaintOp::Fill));
        ops
    }

    #[test]
    fn single_box_gives_one_cell() {
        let ops = vec![
            vrule(50.0, 50.0, 150.0),
            vrule(250.0, 50.0, 150.0),
            hrule(50.0, 50.0, 250.0),
            hrule(150.0, 50.0, 250.0),
            DrawOp::Paint(PaintOp::Fill),
        ];
        let report = reconstruct_page(
            &page(ops, vec![TextRun::at("Total", 60.0, 90.0)]),
            &GridSettings::default(),
        );
        assert!(report.warnings.is_empty());
        let table = table_of(report);
        assert_eq!(table.width, 1);
        assert_eq!(table.height, 1);
        assert_eq!(table.rows, vec![vec!["Total"]]);
        assert!(table.merges.is_empty());
        assert!(table.merge_alias.is_empty());
    }

    #[test]
    fn full_two_by_two_grid() {
        let runs = vec![
            TextRun::at("A", 110.0, 250.0),
            TextRun::at("B", 210.0, 250.0),
            TextRun::at("C", 110.0, 150.0),
            TextRun::at("D", 210.0, 150.0),
        ];
        let table = table_of(reconstruct_page(
            &page(two_by_two(true), runs),
            &GridSettings::default(),
        ));
        assert_eq!((table.width, table.height), (2, 2));
        assert_eq!(table.rows, vec![vec!["A", "B"], vec!["C", "D"]]);
        assert!(table.merges.is_empty());
    }

    #[test]
    fn missing_top_interior_vertical_is_a_merge() {
        let runs = vec![
            TextRun::at("Header", 110.0, 250.0),
            TextRun::at("C", 110.0, 150.0),
            TextRun::at("D", 210.0, 150.0),
        ];
        let table = table_of(reconstruct_page(
            &page(two_by_two(false), runs),
            &GridSettings::default(),
        ));
        assert_eq!(table.merges.len(), 1);
        assert_eq!(
            table.merges[&CellKey::new(0, 0)],
            MergeRegion::new(0, 0, 2, 1)
        );
        assert_eq!(table.merge_alias[&CellKey::new(0, 1)], CellKey::new(0, 0));
        assert_eq!(table.rows, vec![vec!["Header", ""], vec!["C", "D"]]);
        assert_eq!(table.anchor_of(0, 1), CellKey::new(0, 0));
        assert_eq!(table.merge_at(0, 1), Some(&MergeRegion::new(0, 0, 2, 1)));
        assert_eq!(table.merge_at(1, 1), None);
        assert_eq!(table.cell(0, 0), Some("Header"));
        assert_eq!(table.cell(5, 0), None);
    }

    #[test]
    fn edge_guard_empties_the_page() {
        let settings = GridSettings {
            max_edges_per_page: Some(5),
            ..GridSettings::default()
        };
        let report = reconstruct_page(&page(two_by_two(true), vec![]), &settings);
        assert_eq!(report.outcome, PageOutcome::NoTable(NoTableReason::EdgeLimit));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].code,
            ExtractWarningCode::ResourceLimitReached
        );
        assert_eq!(report.warnings[0].page, Some(1));
    }

    #[test]
    fn edge_guard_is_inclusive() {
        let settings = GridSettings {
            max_edges_per_page: Some(7),
            ..GridSettings::default()
        };
        let report = reconstruct_page(&page(two_by_two(true), vec![]), &settings);
        assert!(report.outcome.table().is_some());
    }

    #[test]
    fn page_without_rulings_has_no_columns() {
        let report = reconstruct_page(
            &page(vec![], vec![TextRun::at("loose", 10.0, 10.0)]),
            &GridSettings::default(),
        );
        assert_eq!(report.outcome, PageOutcome::NoTable(NoTableReason::NoColumns));
    }

    #[test]
    fn vertical_rulings_alone_have_no_rows() {
        let ops = vec![vrule(10.0, 0.0, 100.0), vrule(50.0, 0.0, 100.0)];
        let report = reconstruct_page(&page(ops, vec![]), &GridSettings::default());
        assert_eq!(report.outcome, PageOutcome::NoTable(NoTableReason::NoRows));
    }

    #[test]
    fn single_vertical_keeps_its_rows() {
        let ops = vec![vrule(10.0, 0.0, 100.0), hrule(0.0, 0.0, 100.0), hrule(100.0, 0.0, 100.0)];
        let report = reconstruct_page(
            &page(ops, vec![TextRun::at("lost", 50.0, 50.0)]),
            &GridSettings::default(),
        );
        let table = table_of(report);
        assert_eq!((table.width, table.height), (0, 1));
        assert_eq!(table.rows, vec![Vec::<String>::new()]);

        let mut result = PdfTableParseResult::new(1);
        result.record(
            reconstruct_page(
                &page(
                    vec![vrule(10.0, 0.0, 100.0), hrule(0.0, 0.0, 100.0), hrule(100.0, 0.0, 100.0)],
                    vec![],
                ),
                &GridSettings::default(),
            ),
            true,
        );
        assert_eq!(result.page_tables.len(), 1);
    }

    #[test]
    fn single_horizontal_is_an_empty_grid() {
        let ops = vec![vrule(10.0, 0.0, 3.0), vrule(90.0, 0.0, 3.0), hrule(0.0, 10.0, 90.0)];
        let report = reconstruct_page(&page(ops, vec![]), &GridSettings::default());
        assert_eq!(report.outcome, PageOutcome::NoTable(NoTableReason::EmptyGrid));
    }

    #[test]
    fn path_warnings_carry_the_page_number() {
        let mut ops = two_by_two(true);
        ops.push(DrawOp::Restore);
        let content = PageContent::new(4, ops, vec![]);
        let report = reconstruct_page(&content, &GridSettings::default());
        assert!(report.outcome.table().is_some());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].code, ExtractWarningCode::UnbalancedRestore);
        assert_eq!(report.warnings[0].page, Some(4));
    }

    #[test]
    fn record_counts_every_page_and_keeps_tables() {
        let mut result = PdfTableParseResult::new(3);
        let table = table_of(reconstruct_page(
            &page(two_by_two(true), vec![]),
            &GridSettings::default(),
        ));

        result.record(
            PageReport {
                page: 1,
                outcome: PageOutcome::Table(table.clone()),
                warnings: vec![],
            },
            true,
        );
        let mut empty = PageReport::empty(2, NoTableReason::EdgeLimit);
        empty.warnings.push(
            ExtractWarning::with_code(ExtractWarningCode::ResourceLimitReached, "limit")
                .on_page(2),
        );
        result.record(empty, true);
        assert_eq!(result.current_pages, 2);
        assert_eq!(result.page_tables.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.is_complete());

        // an empty page does not erase earlier tables
        result.record(PageReport::empty(3, NoTableReason::NoColumns), true);
        assert_eq!(result.page_tables, vec![table]);
        assert!(result.is_complete());
    }

    #[test]
    fn record_can_drop_warnings() {
        let mut result = PdfTableParseResult::new(1);
        let mut report = PageReport::empty(1, NoTableReason::EdgeLimit);
        report
            .warnings
            .push(ExtractWarning::with_code(ExtractWarningCode::MalformedPath, "x"));
        result.record(report, false);
        assert!(result.warnings.is_empty());
        assert_eq!(result.current_pages, 1);
    }
}
