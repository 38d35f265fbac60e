//! Operator stream and text stream of a single page.
//!
//! These are the inputs of the reconstruction pipeline. A parsing backend
//! produces them from a page's content stream; tests build them by hand.

use crate::geometry::Ctm;

/// A path construction sub-operation inside a [`DrawOp::ConstructPath`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathOp {
    /// `re`: rectangle with its origin corner at `(x, y)`.
    Rectangle {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// `m`: begin a new subpath.
    MoveTo { x: f64, y: f64 },
    /// `l`: straight segment from the current point.
    LineTo { x: f64, y: f64 },
    /// `h`: close the current subpath back to its start point.
    ClosePath,
}

/// How a constructed path is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaintOp {
    /// `S`, `s`.
    Stroke,
    /// `f`, `F`, `f*`.
    Fill,
    /// `B`, `B*`, `b`, `b*`.
    FillAndStroke,
    /// `n`: path discarded (clipping).
    EndPath,
}

/// A drawing operation from a page's operator stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawOp {
    /// A run of path construction operators.
    ConstructPath(Vec<PathOp>),
    /// `q`: push the graphics state.
    Save,
    /// `Q`: pop the graphics state.
    Restore,
    /// `cm`: compose a matrix onto the current transform.
    Transform(Ctm),
    /// `w`: set the stroke line width.
    SetLineWidth(f64),
    /// A painting operator ending the current path.
    Paint(PaintOp),
    /// Anything else (colors, text state, images...). Inert for reconstruction.
    Other(String),
}

/// A positioned run of text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextRun {
    /// Decoded text payload.
    pub text: String,
    /// Text rendering transform in page space; `[4]` and `[5]` are the anchor.
    pub transform: [f64; 6],
}

impl TextRun {
    pub fn new(text: impl Into<String>, transform: [f64; 6]) -> Self {
        Self {
            text: text.into(),
            transform,
        }
    }

    /// Run placed at `(x, y)` with an unscaled transform.
    pub fn at(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self::new(text, [1.0, 0.0, 0.0, 1.0, x, y])
    }

    /// Anchor x coordinate.
    pub fn x(&self) -> f64 {
        self.transform[4]
    }

    /// Anchor y coordinate.
    pub fn y(&self) -> f64 {
        self.transform[5]
    }
}

/// Operator stream and text stream of one page.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageContent {
    /// 1-based page number.
    pub page: usize,
    pub ops: Vec<DrawOp>,
    pub text_runs: Vec<TextRun>,
}

impl PageContent {
    pub fn new(page: usize, ops: Vec<DrawOp>, text_runs: Vec<TextRun>) -> Self {
        Self {
            page,
            ops,
            text_runs,
        }
    }
}
