//! Errors raised while opening documents and interpreting content.
//!
//! [`BackendError`] covers everything that can go wrong between raw PDF bytes
//! and the operator/text streams of a page, and converts into [`PdfError`].

use tablegrid_core::PdfError;
use thiserror::Error;

/// Failure inside the lopdf backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Broken document structure or an unresolvable object.
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Reading the input failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A content stream could not be tokenized or decoded.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// An error already expressed as a [`PdfError`].
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) => PdfError::ParseError(msg),
            BackendError::Io(e) => PdfError::IoError(e.to_string()),
            BackendError::Interpreter(msg) => PdfError::InterpreterError(msg),
            BackendError::Core(e) => e,
        }
    }
}
