//! tablegrid-parse: PDF parsing backend and content stream interpreter.
//!
//! Opens documents through a pluggable [`PdfBackend`] (lopdf by default) and
//! interprets page content streams into the operator stream and text stream
//! that `tablegrid-core` reconstructs tables from. It depends on
//! tablegrid-core for shared data types.

pub mod backend;
pub mod cmap;
pub mod error;
pub mod handler;
mod interpreter;
pub mod lopdf_backend;
pub mod tokenizer;

pub use backend::PdfBackend;
pub use cmap::ToUnicode;
pub use error::BackendError;
pub use handler::ContentHandler;
pub use lopdf_backend::{LopdfBackend, LopdfDocument, LopdfPage};
pub use tablegrid_core;
pub use tokenizer::{Operand, Operator, tokenize};
