//! Assigning text runs to grid cells.

use std::collections::HashMap;

use crate::content::TextRun;
use crate::grid::GridLines;
use crate::merge::{CellKey, MergeAlias};
use crate::settings::GridSettings;

/// Place every run into the cell containing its anchor point.
///
/// Returns a `row_count x column_count` matrix of cell text. Runs outside the
/// grid are dropped. Runs landing in a merged cell are redirected to the
/// anchor cell, so non-anchor cells of a merge region stay empty. A run more
/// than [`GridSettings::line_break_threshold`] above or below the previous
/// run of the same cell starts a new line.
pub fn map_text_to_cells(
    runs: &[TextRun],
    grid: &GridLines,
    merge_alias: &MergeAlias,
    settings: &GridSettings,
) -> Vec<Vec<String>> {
    let rows = grid.row_count();
    let cols = grid.column_count();
    let mut cells = vec![vec![String::new(); cols]; rows];
    let mut last_y: HashMap<CellKey, f64> = HashMap::new();

    let xs = grid.xs();
    let ys = grid.ys();

    for run in runs {
        let (x, y) = (run.x(), run.y());
        let Some(col) = column_of(x, &xs) else {
            continue;
        };
        let Some(row) = row_of(y, &ys) else {
            continue;
        };
        let key = CellKey::new(row, col);
        let key = merge_alias.get(&key).copied().unwrap_or(key);

        let text = &mut cells[key.row][key.col];
        if let Some(prev) = last_y.insert(key, y) {
            if (y - prev).abs() > settings.line_break_threshold {
                text.push('\n');
            }
        }
        text.push_str(&run.text);
    }

    cells
}

/// First column `i` with `xs[i] <= x < xs[i + 1]`.
fn column_of(x: f64, xs: &[f64]) -> Option<usize> {
    xs.windows(2).position(|w| w[0] <= x && x < w[1])
}

/// First row `r` with `ys[r + 1] <= y < ys[r]`; `ys` descends.
fn row_of(y: f64, ys: &[f64]) -> Option<usize> {
    ys.windows(2).position(|w| w[1] <= y && y < w[0])
}
