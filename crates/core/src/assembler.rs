//! Document assembler: open, redact page by page, serialize.

use scrub_ner::EntityRecognizer;
use scrub_pdf::{PdfDocument, SaveOptions};
use serde::Serialize;

use crate::locator::locate_and_redact;
use crate::{CategoryTally, RedactError, Result};

/// Full result of one document run.
#[derive(Debug, Clone, Serialize)]
pub struct RedactionReport {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub summary: String,
    pub tally: CategoryTally,
    pub marks_applied: usize,
    pub pages: usize,
}

/// Redacts every page of `raw` and returns the new bytes with the summary.
pub fn redact_document(raw: &[u8], recognizer: &dyn EntityRecognizer) -> Result<(Vec<u8>, String)> {
    let report = redact_document_with_report(raw, recognizer)?;
    Ok((report.bytes, report.summary))
}

/// Like [`redact_document`], keeping the per-category tally and mark count.
///
/// Any failure aborts the run; no partial output is produced.
pub fn redact_document_with_report(
    raw: &[u8],
    recognizer: &dyn EntityRecognizer,
) -> Result<RedactionReport> {
    let mut doc = PdfDocument::open(raw).map_err(|e| RedactError::DocumentFormat(e.to_string()))?;
    let pages = doc.page_count();
    log::info!("[Assembler] processing {} pages ({} bytes)", pages, raw.len());

    let mut tally = CategoryTally::new();
    let mut marks_applied = 0;
    for index in 0..pages {
        let mut page = doc.page(index)?;
        let outcome = locate_and_redact(&mut page, recognizer)?;
        log::debug!(
            "[Assembler] page {}: {}",
            index + 1,
            if outcome.tally.is_empty() {
                "no matches".to_string()
            } else {
                outcome.tally.summary()
            }
        );
        tally.merge(&outcome.tally);
        marks_applied += outcome.marks_applied;
    }

    let bytes = doc
        .save(SaveOptions::default())
        .map_err(|e| RedactError::Serialization(e.to_string()))?;
    let summary = tally.summary();
    log::info!(
        "[Assembler] done: {} matches, {} marks, output {} bytes",
        tally.total(),
        marks_applied,
        bytes.len()
    );

    Ok(RedactionReport {
        bytes,
        summary,
        tally,
        marks_applied,
        pages,
    })
}
