//! PDF page capability for redaction: text extraction, literal search to
//! page geometry, and destructive application of redaction marks.
//!
//! Text and search use PDFium through `pdfium-render` when the library can be
//! bound, with a `lopdf` content interpreter as fallback. Rewriting is always
//! done with `lopdf`. Coordinates are PDF default user space (points, origin
//! bottom-left).

mod content;
mod document;
mod fonts;
mod layout;
mod page;
mod pdfium;
mod redact;
mod utils;

pub use document::{PdfDocument, SaveOptions};
pub use fonts::helvetica_width;
pub use page::{ApplyOutcome, PdfPage};

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, PdfError>;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("failed to load PDF: {0}")]
    Load(String),
    #[error("failed to save PDF: {0}")]
    Save(String),
    #[error("invalid page content: {0}")]
    Content(String),
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
}

/// Axis-aligned box; `x`/`y` is the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BBox {
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (bottom, top) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            x: left,
            y: bottom,
            w: right - left,
            h: top - bottom,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        const EPS: f32 = 0.01;
        px >= self.x - EPS && px <= self.right() + EPS && py >= self.y - EPS && py <= self.top() + EPS
    }

    /// True when the boxes share a region of non-zero area.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.top() && other.y < self.top()
    }
}

/// A pending redaction: region plus RGB fill (components in 0..=1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedactionMark {
    pub bbox: BBox,
    pub fill: [f32; 3],
}

impl RedactionMark {
    pub const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

    pub fn black(bbox: BBox) -> Self {
        Self {
            bbox,
            fill: Self::BLACK,
        }
    }
}
