//! Page capability the locator works against.
//!
//! The PDF engine page implements it directly; tests substitute an in-memory
//! page so locator rules can be checked without a document.

use scrub_pdf::{BBox, PdfPage, RedactionMark};

use crate::Result;

/// One page that can be searched and destructively redacted.
///
/// Marks queued with [`Page::add_redact_mark`] take effect only on
/// [`Page::apply_redactions`], which also discards them. After an apply, any
/// boxes returned by earlier searches are stale.
pub trait Page {
    /// Plain text of the page.
    fn text(&mut self) -> Result<String>;

    /// Every region where `needle` appears literally; empty when absent.
    fn search_for(&mut self, needle: &str) -> Result<Vec<BBox>>;

    fn add_redact_mark(&mut self, mark: RedactionMark);

    /// Commits all pending marks, returning how many were applied.
    fn apply_redactions(&mut self) -> Result<usize>;
}

impl Page for PdfPage<'_> {
    fn text(&mut self) -> Result<String> {
        Ok(PdfPage::text(self)?)
    }

    fn search_for(&mut self, needle: &str) -> Result<Vec<BBox>> {
        Ok(PdfPage::search_for(self, needle)?)
    }

    fn add_redact_mark(&mut self, mark: RedactionMark) {
        PdfPage::add_redact_mark(self, mark)
    }

    fn apply_redactions(&mut self) -> Result<usize> {
        Ok(PdfPage::apply_redactions(self)?.marks)
    }
}
