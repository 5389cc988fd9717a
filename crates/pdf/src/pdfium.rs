//! Page text and search bounds from PDFium.
//!
//! PDFium is loaded at runtime. When no library can be bound, callers fall
//! back to the built-in content interpreter.

use std::path::PathBuf;
use std::sync::Once;

use pdfium_render::prelude::*;

use crate::BBox;

/// Search hits are widened by this many points on each side.
const SEARCH_PADDING: f32 = 0.5;

static UNAVAILABLE: Once = Once::new();

/// Directories searched for the PDFium shared library, in order.
fn get_pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = std::env::var_os("PDFIUM_DYNAMIC_LIB_PATH") {
        paths.push(PathBuf::from(dir));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());
        }
    }

    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));

    paths
}

pub(crate) fn bind_pdfium() -> Result<Pdfium, String> {
    for path in &get_pdfium_search_paths() {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(path);
        log::debug!("[Pdfium] trying {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::debug!("[Pdfium] bound library in {:?}", path);
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| format!("pdfium library unavailable: {}", e))
}

/// Binds PDFium, logging the first failure only.
pub(crate) fn try_bind() -> Option<Pdfium> {
    match bind_pdfium() {
        Ok(pdfium) => Some(pdfium),
        Err(e) => {
            UNAVAILABLE.call_once(|| {
                log::warn!("[Pdfium] {}, falling back to the lopdf interpreter", e);
            });
            None
        }
    }
}

/// PDFium separates lines with CRLF; the rest of the pipeline expects LF.
fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn page_index(index: usize) -> Result<u16, String> {
    u16::try_from(index).map_err(|_| format!("page index {} exceeds PDFium's range", index))
}

/// Text of every page, in page order.
pub(crate) fn extract_text(pdfium: &Pdfium, bytes: &[u8]) -> Result<Vec<String>, String> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("failed to load PDF: {}", e))?;

    let page_count = document.pages().len();
    let mut results = Vec::with_capacity(page_count as usize);

    for page_idx in 0..page_count {
        let page = document
            .pages()
            .get(page_idx)
            .map_err(|e| format!("failed to get page {}: {}", page_idx, e))?;
        let text = page.text().map_err(|e| format!("failed to extract text: {}", e))?;
        results.push(normalize_text(&text.all()));
    }

    Ok(results)
}

pub(crate) fn page_text(pdfium: &Pdfium, bytes: &[u8], index: usize) -> Result<String, String> {
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("failed to load PDF: {}", e))?;
    let page = document
        .pages()
        .get(page_index(index)?)
        .map_err(|e| format!("failed to get page {}: {}", index, e))?;
    let text = page.text().map_err(|e| format!("failed to extract text: {}", e))?;
    Ok(normalize_text(&text.all()))
}

/// Bounds of every case-sensitive occurrence of `needle`, one box per
/// on-line segment, in PDF user space.
pub(crate) fn search_page(
    pdfium: &Pdfium,
    bytes: &[u8],
    index: usize,
    needle: &str,
) -> Result<Vec<BBox>, String> {
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("failed to load PDF: {}", e))?;
    let page = document
        .pages()
        .get(page_index(index)?)
        .map_err(|e| format!("failed to get page {}: {}", index, e))?;

    let text = page.text().map_err(|e| format!("failed to extract text: {}", e))?;
    let search_options = PdfSearchOptions::new().match_case(true);
    let search = text
        .search(needle, &search_options)
        .map_err(|e| format!("search failed: {}", e))?;

    let mut results = Vec::new();
    for segments in search.iter(PdfSearchDirection::SearchForward) {
        for segment in segments.iter() {
            let bounds = segment.bounds();
            results.push(BBox::from_corners(
                bounds.left().value - SEARCH_PADDING,
                bounds.bottom().value - SEARCH_PADDING,
                bounds.right().value + SEARCH_PADDING,
                bounds.top().value + SEARCH_PADDING,
            ));
        }
    }
    Ok(results)
}
