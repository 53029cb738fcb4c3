pub mod types;
pub mod normalize;
pub mod pdf;
pub mod text;

pub use types::*;
pub use normalize::*;
pub use pdf::*;
pub use text::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    /// Parsed fine but carries (almost) no text: scanned or image-only.
    #[error("PDF has no usable text layer ({chars} characters, need {min})")]
    NoTextLayer { chars: usize, min: usize },

    #[error("Unsupported format for extraction")]
    UnsupportedFormat,
}
