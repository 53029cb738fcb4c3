use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Text of one PDF page, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// What the bytes of a document are, as far as text extraction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Text,
}

/// PDF text-layer extraction (allows mocking in tests).
pub trait PdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError>;

    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;
}

/// Returns canned pages regardless of input. Used by pipeline tests.
pub struct MockPdfExtractor {
    pages: Result<Vec<String>, ExtractionError>,
}

impl MockPdfExtractor {
    pub fn with_text(text: &str) -> Self {
        Self {
            pages: Ok(vec![text.to_string()]),
        }
    }

    pub fn with_pages(pages: Vec<String>) -> Self {
        Self { pages: Ok(pages) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            pages: Err(ExtractionError::PdfParsing(message.to_string())),
        }
    }
}

impl PdfExtractor for MockPdfExtractor {
    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let pages = self.pages.clone()?;
        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                page_number: i + 1,
                text,
            })
            .collect())
    }

    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.pages.as_ref().map_err(Clone::clone)?.len())
    }
}
