use lopdf::{Document, ObjectId};

use crate::layout::{self, PageLayout};
use crate::{pdfium, redact};
use crate::{BBox, PdfError, RedactionMark, Result};

/// What one `apply_redactions` call committed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub marks: usize,
    pub glyphs_removed: usize,
    pub images_removed: usize,
    pub forms_rewritten: usize,
}

/// Mutable handle to one page of a [`crate::PdfDocument`].
///
/// Text and search come from PDFium when it can be bound and from the
/// built-in interpreter otherwise; redactions are always applied by rewriting
/// the content streams. Cached state lives until the next
/// [`PdfPage::apply_redactions`]; search results taken before an apply refer
/// to content that no longer exists.
pub struct PdfPage<'a> {
    doc: &'a mut Document,
    page_id: ObjectId,
    index: usize,
    layout: Option<PageLayout>,
    snapshot: Option<Vec<u8>>,
    marks: Vec<RedactionMark>,
}

impl<'a> PdfPage<'a> {
    pub(crate) fn new(doc: &'a mut Document, page_id: ObjectId, index: usize) -> Self {
        Self {
            doc,
            page_id,
            index,
            layout: None,
            snapshot: None,
            marks: Vec::new(),
        }
    }

    /// Zero-based position in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    fn layout(&mut self) -> Result<&PageLayout> {
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => layout::analyze(self.doc, self.page_id)?,
        };
        Ok(self.layout.insert(layout))
    }

    /// The document serialized for PDFium, as of the last apply.
    fn snapshot(&mut self) -> Result<&[u8]> {
        let bytes = match self.snapshot.take() {
            Some(bytes) => bytes,
            None => {
                let mut buffer = Vec::new();
                self.doc
                    .save_to(&mut buffer)
                    .map_err(|e| PdfError::Save(e.to_string()))?;
                buffer
            }
        };
        let bytes: &[u8] = self.snapshot.insert(bytes);
        Ok(bytes)
    }

    pub fn text(&mut self) -> Result<String> {
        if let Some(pdfium) = pdfium::try_bind() {
            let index = self.index;
            match pdfium::page_text(&pdfium, self.snapshot()?, index) {
                Ok(text) => return Ok(text),
                Err(e) => log::warn!("[Page] pdfium text failed on page {}: {}, using lopdf", index, e),
            }
        }
        Ok(self.layout()?.text())
    }

    /// Every region on the page where `needle` appears literally.
    pub fn search_for(&mut self, needle: &str) -> Result<Vec<BBox>> {
        if let Some(pdfium) = pdfium::try_bind() {
            let index = self.index;
            match pdfium::search_page(&pdfium, self.snapshot()?, index, needle) {
                Ok(hits) => return Ok(hits),
                Err(e) => log::warn!("[Page] pdfium search failed on page {}: {}, using lopdf", index, e),
            }
        }
        Ok(self.layout()?.search(needle))
    }

    pub fn add_redact_mark(&mut self, mark: RedactionMark) {
        self.marks.push(mark);
    }

    pub fn pending_marks(&self) -> &[RedactionMark] {
        &self.marks
    }

    /// Removes everything under the pending marks and paints them.
    ///
    /// With no pending marks the page is left untouched.
    pub fn apply_redactions(&mut self) -> Result<ApplyOutcome> {
        if self.marks.is_empty() {
            return Ok(ApplyOutcome::default());
        }
        let marks = std::mem::take(&mut self.marks);
        self.snapshot = None;
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => layout::analyze(self.doc, self.page_id)?,
        };
        let stats = redact::apply(self.doc, self.page_id, &layout, &marks)?;
        Ok(ApplyOutcome {
            marks: marks.len(),
            glyphs_removed: stats.glyphs_removed,
            images_removed: stats.images_removed,
            forms_rewritten: stats.forms_rewritten,
        })
    }
}
