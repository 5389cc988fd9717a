//! Core orchestration for PII redaction.
//!
//! [`locator`] finds and blacks out PII on one page; [`assembler`] drives it
//! over a whole document and serializes the result.

pub mod assembler;
pub mod document;
pub mod locator;
pub mod tally;

pub use assembler::{redact_document, redact_document_with_report, RedactionReport};
pub use document::Page;
pub use locator::{locate_and_redact, PageOutcome};
pub use scrub_rules::Category;
pub use tally::CategoryTally;

use scrub_pdf::PdfError;

pub type Result<T> = std::result::Result<T, RedactError>;

#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    /// Input bytes are not an openable document
    #[error("invalid PDF document: {0}")]
    DocumentFormat(String),
    /// Output could not be written
    #[error("failed to serialize PDF: {0}")]
    Serialization(String),
    /// The external model call failed
    #[error("external service error: {0}")]
    ExternalService(String),
    /// A page's content could not be interpreted or rewritten
    #[error("page processing failed: {0}")]
    Page(String),
}

impl From<PdfError> for RedactError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::Load(msg) => RedactError::DocumentFormat(msg),
            PdfError::Save(msg) => RedactError::Serialization(msg),
            other => RedactError::Page(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_errors_map_onto_the_taxonomy() {
        assert!(matches!(
            RedactError::from(PdfError::Load("bad xref".into())),
            RedactError::DocumentFormat(m) if m == "bad xref"
        ));
        assert!(matches!(
            RedactError::from(PdfError::Save("disk".into())),
            RedactError::Serialization(_)
        ));
        assert!(matches!(
            RedactError::from(PdfError::Content("bad op".into())),
            RedactError::Page(_)
        ));
    }
}
