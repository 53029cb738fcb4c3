//! Bytes to normalized text.

use super::normalize::{decode_text, normalize_text};
use super::types::{DocumentKind, PdfExtractor};
use super::ExtractionError;
use crate::models::{FileDescriptor, FileKind};

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Readers accept the header anywhere in the first KiB.
const PDF_MAGIC_WINDOW: usize = 1024;

fn has_pdf_magic(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(PDF_MAGIC_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Resolve how to read `bytes`: magic bytes first, then the file extension.
/// `None` for anything that is neither a PDF nor a text file.
pub fn detect_kind(file: &FileDescriptor, bytes: &[u8]) -> Option<DocumentKind> {
    if has_pdf_magic(bytes) {
        return Some(DocumentKind::Pdf);
    }
    match file.kind() {
        FileKind::Pdf => Some(DocumentKind::Pdf),
        FileKind::Text => Some(DocumentKind::Text),
        FileKind::Spreadsheet | FileKind::Other => None,
    }
}

/// Convert document bytes to normalized text.
///
/// PDF pages are joined with `\n`. A PDF whose trimmed text is shorter than
/// `min_pdf_chars` is rejected as [`ExtractionError::NoTextLayer`]; text files
/// are never rejected for being short.
pub fn to_text(
    bytes: &[u8],
    kind: DocumentKind,
    pdf: &dyn PdfExtractor,
    min_pdf_chars: usize,
) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Text => Ok(decode_text(bytes)),
        DocumentKind::Pdf => {
            let pages = pdf.extract_text(bytes)?;
            let joined = pages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let text = normalize_text(&joined);

            let chars = text.trim().chars().count();
            if chars < min_pdf_chars {
                tracing::debug!(
                    pages = pages.len(),
                    chars,
                    min = min_pdf_chars,
                    "PDF text layer too short"
                );
                return Err(ExtractionError::NoTextLayer {
                    chars,
                    min: min_pdf_chars,
                });
            }
            Ok(text)
        }
    }
}

/// [`detect_kind`] followed by [`to_text`].
pub fn read_document(
    file: &FileDescriptor,
    bytes: &[u8],
    pdf: &dyn PdfExtractor,
    min_pdf_chars: usize,
) -> Result<String, ExtractionError> {
    let kind = detect_kind(file, bytes).ok_or(ExtractionError::UnsupportedFormat)?;
    to_text(bytes, kind, pdf, min_pdf_chars)
}
