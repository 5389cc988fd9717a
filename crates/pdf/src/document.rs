use lopdf::{Document, ObjectId};

use crate::page::PdfPage;
use crate::{layout, pdfium, PdfError, Result};

/// Serialization options for [`PdfDocument::save`].
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Drop unreferenced objects and empty streams, then renumber
    pub garbage_collect: bool,
    /// Flate-compress streams that carry no filter yet
    pub compress: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            garbage_collect: true,
            compress: true,
        }
    }
}

/// An opened PDF, owned by one request.
pub struct PdfDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(bytes).map_err(|e| PdfError::Load(e.to_string()))?;
        if inner.trailer.get(b"Encrypt").is_ok() {
            return Err(PdfError::Load("encrypted documents are not supported".into()));
        }
        // get_pages is keyed by page number, so values come out in page order
        let page_ids: Vec<ObjectId> = inner.get_pages().into_values().collect();
        log::debug!("[Document] opened {} bytes, {} pages", bytes.len(), page_ids.len());
        Ok(Self { inner, page_ids })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page(&mut self, index: usize) -> Result<PdfPage<'_>> {
        let page_id = *self.page_ids.get(index).ok_or(PdfError::PageOutOfRange {
            index,
            count: self.page_ids.len(),
        })?;
        Ok(PdfPage::new(&mut self.inner, page_id, index))
    }

    /// Plain text of every page, in page order.
    ///
    /// PDFium is preferred; the built-in interpreter covers its absence.
    pub fn extract_text(&self) -> Result<Vec<String>> {
        if let Some(pdfium) = pdfium::try_bind() {
            let mut buffer = Vec::new();
            self.inner
                .clone()
                .save_to(&mut buffer)
                .map_err(|e| PdfError::Save(e.to_string()))?;
            match pdfium::extract_text(&pdfium, &buffer) {
                Ok(texts) => return Ok(texts),
                Err(e) => log::warn!("[Document] pdfium extraction failed: {}, using lopdf", e),
            }
        }
        self.page_ids
            .iter()
            .map(|id| layout::analyze(&self.inner, *id).map(|l| l.text()))
            .collect()
    }

    pub fn save(mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if options.garbage_collect {
            let pruned = self.inner.prune_objects();
            let emptied = self.inner.delete_zero_length_streams();
            self.inner.renumber_objects();
            log::debug!(
                "[Document] pruned {} objects, removed {} empty streams",
                pruned.len(),
                emptied.len()
            );
        }
        if options.compress {
            self.inner.compress();
        }
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        Ok(buffer)
    }
}
