//! Tolerances and resource limits for grid reconstruction.

/// Tolerances used by the reconstruction pipeline.
///
/// All values are in page-space units (PDF points for unscaled pages).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSettings {
    /// Maximum thickness of a ruling. Thinner rectangles are edges; also the
    /// clustering tolerance for grid-line coordinates.
    pub line_max_width: f64,
    /// Largest gap between collinear edges that still joins them into one span.
    pub span_join_gap: f64,
    /// Tolerance for matching a coverage end to a grid line and for detecting
    /// table boundaries without a ruling.
    pub snap_tolerance: f64,
    /// Vertical displacement above which a new run in the same cell starts a new line.
    pub line_break_threshold: f64,
    /// Maximum number of edges on one page before the page is abandoned.
    pub max_edges_per_page: Option<usize>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            line_max_width: 2.0,
            span_join_gap: 10.0,
            snap_tolerance: 5.0,
            line_break_threshold: 5.0,
            max_edges_per_page: None,
        }
    }
}

/// Options controlling document-level extraction.
///
/// Resource limits prevent pathological documents from consuming unbounded
/// work. Per-page limits never fail the extraction; they empty the page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractOptions {
    /// Maximum number of edges per page (default: None = no limit).
    pub max_edges_per_page: Option<usize>,
    /// Maximum nesting depth of Form XObjects (default: 10).
    pub max_recursion_depth: usize,
    /// Maximum input size in bytes (default: None = no limit).
    pub max_input_bytes: Option<usize>,
    /// Whether to record per-page anomalies as warnings (default: true).
    pub collect_warnings: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_edges_per_page: None,
            max_recursion_depth: 10,
            max_input_bytes: None,
            collect_warnings: true,
        }
    }
}

impl ExtractOptions {
    /// Grid settings for one page under these options.
    pub fn grid_settings(&self) -> GridSettings {
        GridSettings {
            max_edges_per_page: self.max_edges_per_page,
            ..GridSettings::default()
        }
    }
}
