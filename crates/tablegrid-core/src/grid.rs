//! Grid line construction.
//!
//! Clusters edges by their perpendicular coordinate into grid lines and joins
//! the collinear edges of each cluster into coverage intervals: the parts of
//! the page the grid line actually rules across.

use crate::edges::Edge;
use crate::settings::GridSettings;

/// A closed range along a grid line.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// True when the two ranges overlap or share an endpoint.
    pub fn touches(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest interval containing both.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// One inferred table boundary: a column edge (vertical) or a row edge (horizontal).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridLine {
    /// x for vertical lines, y for horizontal lines.
    pub coordinate: f64,
    /// Disjoint, non-touching intervals sorted by start.
    pub coverage: Vec<Interval>,
}

impl GridLine {
    /// A grid line without coverage. Open table boundaries stay that way.
    pub fn new(coordinate: f64) -> Self {
        Self {
            coordinate,
            coverage: Vec::new(),
        }
    }

    /// Insert a coverage interval, merging it with every interval it touches.
    ///
    /// A merge can make the grown interval touch further neighbours, so the
    /// search repeats until nothing touches; the list stays disjoint and sorted.
    pub fn insert(&mut self, interval: Interval) {
        let mut merged = interval;
        while let Some(i) = self.coverage.iter().position(|c| c.touches(&merged)) {
            let hit = self.coverage.remove(i);
            merged = merged.union(&hit);
        }
        let at = self.coverage.partition_point(|c| c.start < merged.start);
        self.coverage.insert(at, merged);
    }

    /// Range from the lowest covered point to the highest.
    pub fn extent(&self) -> Option<Interval> {
        match (self.coverage.first(), self.coverage.last()) {
            (Some(first), Some(last)) => Some(Interval::new(first.start, last.end)),
            _ => None,
        }
    }
}

/// The finished grid of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLines {
    /// Column boundaries, ascending x.
    pub verticals: Vec<GridLine>,
    /// Row boundaries in row order: descending y, top of the page first.
    pub horizontals: Vec<GridLine>,
}

impl GridLines {
    /// Number of cell columns.
    pub fn column_count(&self) -> usize {
        self.verticals.len().saturating_sub(1)
    }

    /// Number of cell rows.
    pub fn row_count(&self) -> usize {
        self.horizontals.len().saturating_sub(1)
    }

    /// x coordinates of the column boundaries.
    pub fn xs(&self) -> Vec<f64> {
        self.verticals.iter().map(|l| l.coordinate).collect()
    }

    /// y coordinates of the row boundaries, top first.
    pub fn ys(&self) -> Vec<f64> {
        self.horizontals.iter().map(|l| l.coordinate).collect()
    }
}

/// Why no grid could be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFailure {
    NoColumns,
    NoRows,
}

/// Build both grid line families from a page's edges.
///
/// # Errors
///
/// Returns [`GridFailure`] when either pass yields no grid line.
pub fn build_grid(edges: &[Edge], settings: &GridSettings) -> Result<GridLines, GridFailure> {
    let verticals = build_verticals(edges, settings);
    if verticals.is_empty() {
        return Err(GridFailure::NoColumns);
    }
    let mut horizontals = build_horizontals(edges, settings);
    if horizontals.is_empty() {
        return Err(GridFailure::NoRows);
    }
    horizontals.reverse();
    Ok(GridLines {
        verticals,
        horizontals,
    })
}

/// Vertical grid lines, ascending x. Edges wider than a ruling are skipped.
pub fn build_verticals(edges: &[Edge], settings: &GridSettings) -> Vec<GridLine> {
    build_lines(edges, settings, |e| Projection {
        coordinate: e.x,
        thickness: e.width,
        span: Interval::new(e.y, e.y1()),
    })
}

/// Horizontal grid lines, ascending y. Edges taller than a ruling are skipped.
pub fn build_horizontals(edges: &[Edge], settings: &GridSettings) -> Vec<GridLine> {
    build_lines(edges, settings, |e| Projection {
        coordinate: e.y,
        thickness: e.height,
        span: Interval::new(e.x, e.x1()),
    })
}

/// An edge seen from one axis.
#[derive(Debug, Clone, Copy)]
struct Projection {
    coordinate: f64,
    thickness: f64,
    span: Interval,
}

fn build_lines<F>(edges: &[Edge], settings: &GridSettings, project: F) -> Vec<GridLine>
where
    F: Fn(&Edge) -> Projection,
{
    let mut projected: Vec<Projection> = edges
        .iter()
        .map(project)
        .filter(|p| p.thickness <= settings.line_max_width)
        .collect();
    projected.sort_by(|a, b| {
        a.coordinate
            .total_cmp(&b.coordinate)
            .then_with(|| a.span.start.total_cmp(&b.span.start))
    });

    let mut lines = Vec::new();
    let mut current: Option<GridLine> = None;
    let mut span: Option<Interval> = None;

    for p in projected {
        let starts_new_line = match &current {
            Some(line) => p.coordinate - line.coordinate > settings.line_max_width,
            None => true,
        };
        if starts_new_line {
            if let Some(mut line) = current.take() {
                close_span(&mut line, span.take(), settings);
                if !line.coverage.is_empty() {
                    lines.push(line);
                }
            }
            current = Some(GridLine::new(p.coordinate));
        }

        span = match span {
            Some(s) if joins(&s, &p.span, settings.span_join_gap) => Some(s.union(&p.span)),
            Some(s) => {
                if let Some(line) = current.as_mut() {
                    close_span(line, Some(s), settings);
                }
                Some(p.span)
            }
            None => Some(p.span),
        };
    }

    if let Some(mut line) = current {
        close_span(&mut line, span, settings);
        if !line.coverage.is_empty() {
            lines.push(line);
        }
    }

    lines
}

/// Whether two spans on the same line are close enough to be one ruling.
fn joins(a: &Interval, b: &Interval, gap: f64) -> bool {
    b.start - a.end < gap && a.start - b.end < gap
}

/// Commit a running span to the line if it is longer than a ruling is thick.
fn close_span(line: &mut GridLine, span: Option<Interval>, settings: &GridSettings) {
    if let Some(s) = span {
        if s.len() > settings.line_max_width {
            line.insert(s);
        }
    }
}
