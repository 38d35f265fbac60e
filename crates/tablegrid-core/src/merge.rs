//! Merged-cell detection.
//!
//! A grid line that does not rule across a cell boundary means the two cells
//! on either side of it belong together. Gaps in the interior row boundaries
//! give row spans, gaps in the interior column boundaries give column spans.
//! Adjacent candidates are chained into larger regions, the two directions are
//! combined per anchor and every non-anchor cell gets an alias to its anchor.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::grid::{GridLine, GridLines, Interval};
use crate::settings::GridSettings;

/// Position of a cell in the grid, rendered as `"row-col"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

/// Error parsing a [`CellKey`] from its `"row-col"` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCellKeyError(String);

impl fmt::Display for ParseCellKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cell key {:?}, expected \"row-col\"", self.0)
    }
}

impl std::error::Error for ParseCellKeyError {}

impl FromStr for CellKey {
    type Err = ParseCellKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCellKeyError(s.to_string());
        let (row, col) = s.split_once('-').ok_or_else(err)?;
        Ok(CellKey {
            row: row.parse().map_err(|_| err())?,
            col: col.parse().map_err(|_| err())?,
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CellKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A rectangular run of cells anchored at its top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeRegion {
    pub row: usize,
    pub col: usize,
    /// Column span.
    pub width: usize,
    /// Row span.
    pub height: usize,
}

impl MergeRegion {
    pub fn new(row: usize, col: usize, width: usize, height: usize) -> Self {
        Self {
            row,
            col,
            width,
            height,
        }
    }

    pub fn anchor(&self) -> CellKey {
        CellKey::new(self.row, self.col)
    }

    /// Whether `(row, col)` lies inside this region.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.row + self.height && col >= self.col && col < self.col + self.width
    }

    /// Every cell of the region, anchor first, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        (self.row..self.row + self.height)
            .flat_map(move |r| (self.col..self.col + self.width).map(move |c| CellKey::new(r, c)))
    }
}

/// Anchor key to merge region.
pub type MergeMap = BTreeMap<CellKey, MergeRegion>;

/// Covered, non-anchor cell to its anchor.
pub type MergeAlias = BTreeMap<CellKey, CellKey>;

/// Output of merge detection.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeLayout {
    /// The grid with virtual boundary rows added where the table has no ruling.
    pub grid: GridLines,
    pub merges: MergeMap,
    pub merge_alias: MergeAlias,
}

/// Direction in which candidates chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    /// Cells stacked across a missing row boundary.
    Rows,
    /// Cells side by side across a missing column boundary.
    Cols,
}

/// Detect merged cells and close open table boundaries.
pub fn detect_merges(grid: GridLines, settings: &GridSettings) -> MergeLayout {
    let grid = close_open_boundaries(grid, settings);
    let rows = grid.row_count();
    let cols = grid.column_count();
    let xs = grid.xs();
    let ys = grid.ys();

    // interior row boundaries only: the outermost ones frame the table
    let mut row_spans = MergeMap::new();
    for k in 1..rows {
        let line = &grid.horizontals[k];
        for c in 0..cols {
            if !covers(line, xs[c], xs[c + 1], settings.snap_tolerance) {
                row_spans.insert(CellKey::new(k - 1, c), MergeRegion::new(k - 1, c, 1, 2));
            }
        }
    }

    let mut col_spans = MergeMap::new();
    for j in 1..cols {
        let line = &grid.verticals[j];
        for r in 0..rows {
            // ys descend, so row r spans ys[r + 1]..ys[r]
            if !covers(line, ys[r + 1], ys[r], settings.snap_tolerance) {
                col_spans.insert(CellKey::new(r, j - 1), MergeRegion::new(r, j - 1, 2, 1));
            }
        }
    }

    chain(&mut row_spans, Span::Rows);
    chain(&mut col_spans, Span::Cols);

    let combined = combine(row_spans, col_spans);
    let merges = resolve_overlaps(combined, rows, cols);
    let merge_alias = build_alias(&merges);

    tracing::debug!(
        rows,
        cols,
        merges = merges.len(),
        aliases = merge_alias.len(),
        "merge detection finished"
    );

    MergeLayout {
        grid,
        merges,
        merge_alias,
    }
}

/// Add a virtual row boundary above or below the table when the columns
/// extend past the outermost horizontal ruling.
fn close_open_boundaries(mut grid: GridLines, settings: &GridSettings) -> GridLines {
    let extents: Vec<Interval> = grid.verticals.iter().filter_map(GridLine::extent).collect();
    let (Some(top), Some(bottom)) = (
        extents.iter().map(|e| e.end).reduce(f64::max),
        extents.iter().map(|e| e.start).reduce(f64::min),
    ) else {
        return grid;
    };

    if let Some(first) = grid.horizontals.first() {
        if top > first.coordinate + settings.snap_tolerance {
            tracing::debug!(y = top, "table top is open, adding virtual row boundary");
            grid.horizontals.insert(0, GridLine::new(top));
        }
    }
    if let Some(last) = grid.horizontals.last() {
        if bottom < last.coordinate - settings.snap_tolerance {
            tracing::debug!(y = bottom, "table bottom is open, adding virtual row boundary");
            grid.horizontals.push(GridLine::new(bottom));
        }
    }
    grid
}

/// Whether some coverage interval of `line` rules across `lo..hi`.
fn covers(line: &GridLine, lo: f64, hi: f64, tolerance: f64) -> bool {
    line.coverage
        .iter()
        .any(|iv| iv.start <= lo + tolerance && iv.end >= hi - tolerance)
}

/// Absorb every candidate whose anchor is another candidate's far corner,
/// until a full scan makes no change.
fn chain(candidates: &mut MergeMap, span: Span) {
    loop {
        let mut absorbed = false;
        let keys: Vec<CellKey> = candidates.keys().copied().collect();
        for key in keys {
            let Some(mut region) = candidates.remove(&key) else {
                continue;
            };
            loop {
                let corner = CellKey::new(region.row + region.height - 1, region.col + region.width - 1);
                if corner == region.anchor() {
                    break;
                }
                let Some(next) = candidates.remove(&corner) else {
                    break;
                };
                match span {
                    Span::Rows => region.height += next.height - 1,
                    Span::Cols => region.width += next.width - 1,
                }
                absorbed = true;
            }
            candidates.insert(key, region);
        }
        if !absorbed {
            break;
        }
    }
}

/// Union of both directions: width from column spans, height from row spans.
fn combine(row_spans: MergeMap, col_spans: MergeMap) -> MergeMap {
    let mut merges = row_spans;
    for (key, region) in col_spans {
        merges
            .entry(key)
            .and_modify(|m| m.width = region.width)
            .or_insert(region);
    }
    merges
}

/// Keep regions pairwise disjoint and inside the grid.
///
/// Regions are visited in row-major anchor order. A region whose anchor is
/// already covered is dropped; one that overlaps an earlier region is shrunk,
/// rows first, and dropped if only its anchor is left.
fn resolve_overlaps(combined: MergeMap, rows: usize, cols: usize) -> MergeMap {
    let mut covered = vec![vec![false; cols]; rows];
    let mut merges = MergeMap::new();

    for (key, mut region) in combined {
        if key.row >= rows || key.col >= cols || covered[key.row][key.col] {
            continue;
        }
        region.height = region.height.min(rows - region.row);
        region.width = region.width.min(cols - region.col);

        let overlaps = |r: &MergeRegion| r.cells().any(|c| covered[c.row][c.col]);
        while region.height > 1 && overlaps(&region) {
            region.height -= 1;
        }
        while region.width > 1 && overlaps(&region) {
            region.width -= 1;
        }
        if region.width == 1 && region.height == 1 {
            continue;
        }

        for cell in region.cells() {
            covered[cell.row][cell.col] = true;
        }
        merges.insert(key, region);
    }
    merges
}

fn build_alias(merges: &MergeMap) -> MergeAlias {
    let mut alias = MergeAlias::new();
    for region in merges.values() {
        let anchor = region.anchor();
        for cell in region.cells().filter(|c| *c != anchor) {
            alias.insert(cell, anchor);
        }
    }
    alias
}
