//! Typesets plain text into a fresh PDF.
//!
//! Used to rebuild a document from model output: one Helvetica flow, each
//! input line wrapped to the text width, automatic page breaks.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use scrub_pdf::helvetica_width;
use serde::{Deserialize, Serialize};

const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to encode page content: {0}")]
    Content(String),
    #[error("failed to write PDF: {0}")]
    Save(String),
}

/// Page geometry and type settings, in millimetres unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    /// Distance from the bottom edge that triggers a page break
    pub bottom_margin_mm: f32,
    /// Horizontal padding inside the text column
    pub cell_padding_mm: f32,
    pub font_size_pt: f32,
    pub line_height_mm: f32,
}

impl Default for TextLayout {
    /// A4 portrait, 12pt Helvetica on 10 mm lines.
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 10.0,
            bottom_margin_mm: 20.0,
            cell_padding_mm: 1.0,
            font_size_pt: 12.0,
            line_height_mm: 10.0,
        }
    }
}

impl TextLayout {
    /// Usable line width in points.
    pub fn text_width_pt(&self) -> f32 {
        (self.page_width_mm - 2.0 * self.margin_mm - 2.0 * self.cell_padding_mm) * PT_PER_MM
    }

    fn rows_per_page(&self) -> usize {
        let usable = self.page_height_mm - self.margin_mm - self.bottom_margin_mm;
        ((usable / self.line_height_mm).floor() as usize).max(1)
    }
}

/// Width of `text` in points at `font_size`.
pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(|c| f32::from(helvetica_width(c))).sum::<f32>() * font_size / 1000.0
}

/// Breaks one logical line into rows no wider than `max_width`.
///
/// Breaks at the last space that fits; a word wider than the line is split
/// between characters. An empty line still yields one (empty) row.
pub fn wrap_line(line: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut rows = Vec::new();
    let chars: Vec<char> = line.chars().collect();
    let mut start = 0;

    while start < chars.len() {
        let mut width = 0.0;
        let mut end = start;
        let mut last_space = None;
        while end < chars.len() {
            let w = f32::from(helvetica_width(chars[end])) * font_size / 1000.0;
            if width + w > max_width && end > start {
                break;
            }
            if chars[end] == ' ' {
                last_space = Some(end);
            }
            width += w;
            end += 1;
        }
        if end == chars.len() {
            rows.push(chars[start..end].iter().collect());
            break;
        }
        if chars[end] == ' ' {
            rows.push(chars[start..end].iter().collect());
            start = end + 1;
            continue;
        }
        match last_space {
            Some(space) if space > start => {
                rows.push(chars[start..space].iter().collect());
                start = space + 1;
            }
            _ => {
                rows.push(chars[start..end].iter().collect());
                start = end;
            }
        }
    }

    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

/// Wraps every line and splits the rows into pages. Always at least one page.
pub fn paginate(text: &str, layout: &TextLayout) -> Vec<Vec<String>> {
    let max_width = layout.text_width_pt();
    let per_page = layout.rows_per_page();
    let rows: Vec<String> = text
        .lines()
        .flat_map(|line| wrap_line(line, max_width, layout.font_size_pt))
        .collect();

    if rows.is_empty() {
        return vec![Vec::new()];
    }
    rows.chunks(per_page).map(<[String]>::to_vec).collect()
}

/// Latin-1 bytes for the standard font; anything outside becomes `?`.
fn encode_latin1(row: &str) -> Vec<u8> {
    row.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn page_operations(rows: &[String], layout: &TextLayout) -> Vec<Operation> {
    let page_height = layout.page_height_mm * PT_PER_MM;
    let x = (layout.margin_mm + layout.cell_padding_mm) * PT_PER_MM;
    let font_size_mm = layout.font_size_pt / PT_PER_MM;

    let mut ops = Vec::with_capacity(rows.len() * 5);
    for (i, row) in rows.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        // baseline sits a little below the middle of the row cell
        let top = layout.margin_mm + i as f32 * layout.line_height_mm;
        let baseline_mm = top + 0.5 * layout.line_height_mm + 0.3 * font_size_mm;
        let y = page_height - baseline_mm * PT_PER_MM;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Real(layout.font_size_pt)],
        ));
        ops.push(Operation::new("Td", vec![Object::Real(x), Object::Real(y)]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_latin1(row), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Renders `text` as a new PDF document.
pub fn render_text_pdf(text: &str, layout: &TextLayout) -> Result<Vec<u8>, RenderError> {
    let pages = paginate(text, layout);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        Object::Real(layout.page_width_mm * PT_PER_MM),
        Object::Real(layout.page_height_mm * PT_PER_MM),
    ];

    let mut kids = Vec::with_capacity(pages.len());
    for rows in &pages {
        let content = Content {
            operations: page_operations(rows, layout),
        };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Content(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::Save(e.to_string()))?;
    log::info!(
        "[Render] typeset {} pages ({} bytes)",
        pages.len(),
        buffer.len()
    );
    Ok(buffer)
}
