//! Error and warning types for tablegrid.
//!
//! Provides [`PdfError`] for fatal errors that stop a whole extraction and
//! [`ExtractWarning`] for per-page anomalies that are absorbed and reported
//! alongside the result.

use std::fmt;

/// Fatal error types for table extraction.
///
/// Only document-level failures surface as errors. A page without a table,
/// or a page that trips a resource guard, is never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// The document structure could not be parsed.
    ParseError(String),
    /// The input could not be read.
    IoError(String),
    /// The interpreter could not run a content stream.
    InterpreterError(String),
    /// Input exceeded one of the limits in `ExtractOptions`.
    ResourceLimitExceeded {
        /// Option name, e.g. `"max_input_bytes"`.
        limit_name: String,
        /// Configured value.
        limit_value: usize,
        /// Observed value.
        actual_value: usize,
    },
    /// The PDF is encrypted and cannot be read.
    PasswordRequired,
    /// Anything else.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
            } => write!(
                f,
                "resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})"
            ),
            PdfError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

/// What kind of anomaly a warning reports.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum ExtractWarningCode {
    /// A per-page resource limit was reached; the page was abandoned.
    ResourceLimitReached,
    /// A path segment had no start point or could not be interpreted.
    MalformedPath,
    /// A restore operator had no matching save.
    UnbalancedRestore,
    /// A content stream operator could not be processed.
    UnsupportedOperator,
    /// A font referenced by the content stream was not found.
    MissingFont,
    /// Any other warning.
    Other(String),
}

impl ExtractWarningCode {
    /// Stable upper-case tag, e.g. `"MISSING_FONT"`.
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::ResourceLimitReached => "RESOURCE_LIMIT_REACHED",
            ExtractWarningCode::MalformedPath => "MALFORMED_PATH",
            ExtractWarningCode::UnbalancedRestore => "UNBALANCED_RESTORE",
            ExtractWarningCode::UnsupportedOperator => "UNSUPPORTED_OPERATOR",
            ExtractWarningCode::MissingFont => "MISSING_FONT",
            ExtractWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal issue encountered while processing a page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractWarning {
    /// What kind of anomaly a warning reports.
    pub code: ExtractWarningCode,
    /// Human-readable description.
    pub description: String,
    /// 1-based page number, if known.
    pub page: Option<usize>,
}

impl ExtractWarning {
    /// Warning with `code`, not yet tied to a page.
    pub fn with_code(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
        }
    }

    /// Attach a page number, returning the modified warning.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        Ok(())
    }
}
