//! Edge extraction from a page's operator stream.
//!
//! Edges are thin axis-aligned rectangles in page space that behave as
//! table rulings. They come from three sources:
//!
//! - `re` rectangles thinner than [`GridSettings::line_max_width`],
//! - axis-aligned `m`/`l` (and `h`) segments, thickened by the current line width,
//! - the four sides of a stroked rectangle that is too wide to be a ruling itself.
//!
//! Each candidate keeps the transform that was active when it was drawn and is
//! normalized to a page-space bounding box once the whole stream is consumed.

use std::fmt;

use crate::content::{DrawOp, PaintOp, PathOp};
use crate::error::{ExtractWarning, ExtractWarningCode};
use crate::geometry::{Ctm, Point};
use crate::settings::GridSettings;

/// Tolerance for deciding that a segment is axis-aligned.
const EDGE_AXIS_TOLERANCE: f64 = 1e-6;

/// A thin axis-aligned rectangle acting as a ruling segment.
///
/// `(x, y)` is the bottom-left corner in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Edge {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right x coordinate.
    pub fn x1(&self) -> f64 {
        self.x + self.width
    }

    /// Top y coordinate.
    pub fn y1(&self) -> f64 {
        self.y + self.height
    }

    /// Normalize a rectangle with possibly negative extents.
    fn normalized(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: x.min(x + width),
            y: y.min(y + height),
            width: width.abs(),
            height: height.abs(),
        }
    }

    /// Bounding box of this rectangle after mapping its four corners through `ctm`.
    pub fn transformed(&self, ctm: &Ctm) -> Edge {
        let corners = [
            ctm.apply(Point::new(self.x, self.y)),
            ctm.apply(Point::new(self.x1(), self.y)),
            ctm.apply(Point::new(self.x, self.y1())),
            ctm.apply(Point::new(self.x1(), self.y1())),
        ];
        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in corners {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Edge::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// The per-page edge limit was exceeded; the page must be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLimitExceeded {
    pub limit: usize,
}

impl fmt::Display for EdgeLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page exceeds the limit of {} edges", self.limit)
    }
}

impl std::error::Error for EdgeLimitExceeded {}

/// Edges of one page plus the anomalies met while collecting them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeExtraction {
    /// Normalized edges in page space.
    pub edges: Vec<Edge>,
    pub warnings: Vec<ExtractWarning>,
}

/// Collect the ruling edges drawn by `ops`.
///
/// # Errors
///
/// Returns [`EdgeLimitExceeded`] as soon as the number of recorded edges goes
/// past `settings.max_edges_per_page`. No partial edge set is produced.
pub fn extract_edges(
    ops: &[DrawOp],
    settings: &GridSettings,
) -> Result<EdgeExtraction, EdgeLimitExceeded> {
    let mut extractor = EdgeExtractor::new(settings);
    for op in ops {
        extractor.process(op)?;
    }
    Ok(extractor.finish())
}

/// Saved graphics state for `q`/`Q`.
#[derive(Debug, Clone, Copy)]
struct SavedState {
    ctm: Ctm,
    line_width: Option<f64>,
}

/// State machine walking the operator stream.
struct EdgeExtractor<'a> {
    settings: &'a GridSettings,
    ctm: Ctm,
    line_width: Option<f64>,
    stack: Vec<SavedState>,
    current: Option<Point>,
    subpath_start: Option<Point>,
    /// Wide rectangles of the current path, waiting to learn whether they are stroked.
    outlines: Vec<(Edge, Ctm)>,
    /// Local-space edges with the transform active when they were drawn.
    candidates: Vec<(Edge, Ctm)>,
    warnings: Vec<ExtractWarning>,
}

impl<'a> EdgeExtractor<'a> {
    fn new(settings: &'a GridSettings) -> Self {
        Self {
            settings,
            ctm: Ctm::identity(),
            line_width: None,
            stack: Vec::new(),
            current: None,
            subpath_start: None,
            outlines: Vec::new(),
            candidates: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn process(&mut self, op: &DrawOp) -> Result<(), EdgeLimitExceeded> {
        match op {
            DrawOp::ConstructPath(path) => {
                for sub in path {
                    self.path_op(*sub)?;
                }
            }
            DrawOp::Save => self.stack.push(SavedState {
                ctm: self.ctm,
                line_width: self.line_width,
            }),
            DrawOp::Restore => match self.stack.pop() {
                Some(saved) => {
                    self.ctm = saved.ctm;
                    self.line_width = saved.line_width;
                }
                None => self.warnings.push(ExtractWarning::with_code(
                    ExtractWarningCode::UnbalancedRestore,
                    "restore without matching save",
                )),
            },
            DrawOp::Transform(m) => self.ctm = self.ctm.compose(m),
            DrawOp::SetLineWidth(w) => self.line_width = Some(*w),
            DrawOp::Paint(paint) => self.paint(*paint)?,
            DrawOp::Other(name) => tracing::trace!(op = %name, "inert operator"),
        }
        Ok(())
    }

    fn path_op(&mut self, op: PathOp) -> Result<(), EdgeLimitExceeded> {
        match op {
            PathOp::Rectangle {
                x,
                y,
                width,
                height,
            } => {
                let rect = Edge::normalized(x, y, width, height);
                if rect.width.min(rect.height) < self.settings.line_max_width {
                    self.record(rect)?;
                } else {
                    self.outlines.push((rect, self.ctm));
                }
                self.current = Some(Point::new(x, y));
                self.subpath_start = self.current;
            }
            PathOp::MoveTo { x, y } => {
                self.current = Some(Point::new(x, y));
                self.subpath_start = self.current;
            }
            PathOp::LineTo { x, y } => {
                let to = Point::new(x, y);
                match self.current {
                    Some(from) => self.segment(from, to)?,
                    None => self.warnings.push(ExtractWarning::with_code(
                        ExtractWarningCode::MalformedPath,
                        "line segment without a current point",
                    )),
                }
                self.current = Some(to);
            }
            PathOp::ClosePath => {
                if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
                    self.segment(from, start)?;
                }
                self.current = self.subpath_start;
            }
        }
        Ok(())
    }

    /// Turn an axis-aligned segment into an edge centered on the line.
    fn segment(&mut self, from: Point, to: Point) -> Result<(), EdgeLimitExceeded> {
        let Some(lw) = self.line_width else {
            return Ok(());
        };
        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        if dx < EDGE_AXIS_TOLERANCE && dy >= EDGE_AXIS_TOLERANCE {
            self.record(Edge::new(from.x - lw / 2.0, from.y.min(to.y), lw, dy))
        } else if dy < EDGE_AXIS_TOLERANCE && dx >= EDGE_AXIS_TOLERANCE {
            self.record(Edge::new(from.x.min(to.x), from.y - lw / 2.0, dx, lw))
        } else {
            Ok(())
        }
    }

    fn paint(&mut self, paint: PaintOp) -> Result<(), EdgeLimitExceeded> {
        let outlines = std::mem::take(&mut self.outlines);
        if matches!(paint, PaintOp::Stroke | PaintOp::FillAndStroke) {
            if let Some(lw) = self.line_width {
                for (rect, ctm) in outlines {
                    let half = lw / 2.0;
                    let sides = [
                        Edge::new(rect.x - half, rect.y, lw, rect.height),
                        Edge::new(rect.x1() - half, rect.y, lw, rect.height),
                        Edge::new(rect.x, rect.y - half, rect.width, lw),
                        Edge::new(rect.x, rect.y1() - half, rect.width, lw),
                    ];
                    for side in sides {
                        self.record_with(side, ctm)?;
                    }
                }
            }
        }
        self.current = None;
        self.subpath_start = None;
        Ok(())
    }

    fn record(&mut self, edge: Edge) -> Result<(), EdgeLimitExceeded> {
        self.record_with(edge, self.ctm)
    }

    fn record_with(&mut self, edge: Edge, ctm: Ctm) -> Result<(), EdgeLimitExceeded> {
        self.candidates.push((edge, ctm));
        match self.settings.max_edges_per_page {
            Some(limit) if self.candidates.len() > limit => Err(EdgeLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    fn finish(self) -> EdgeExtraction {
        let edges = self
            .candidates
            .iter()
            .map(|(edge, ctm)| edge.transformed(ctm))
            .collect();
        EdgeExtraction {
            edges,
            warnings: self.warnings,
        }
    }
}
