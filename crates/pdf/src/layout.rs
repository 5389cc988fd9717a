//! Content-stream interpreter producing positioned glyphs.
//!
//! Only the text and image state that affects placement is tracked; paths and
//! colour are passed through untouched. Form XObjects are interpreted in
//! place, under their `/Matrix` and with their own resources.

use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::content::{ContentStream, INLINE_IMAGE};
use crate::fonts::{fonts_in, FontInfo};
use crate::utils::{
    get_number, get_page_content, get_stream_content, multiply, numbers, page_resources, resolve,
    resolve_dict, transform_point, IDENTITY,
};
use crate::{BBox, Result};

/// Ascent and descent as a fraction of the font size.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = -0.2;
/// TJ adjustments more negative than this read as a word break.
const TJ_SPACE_THRESHOLD: f32 = -200.0;
const MAX_FORM_DEPTH: usize = 12;

/// Where a glyph's bytes live.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphSource {
    /// Index into `PageLayout::streams`
    pub stream: usize,
    /// Index into that stream's operations
    pub op: usize,
    /// Element index inside a `TJ` array, 0 for the other show operators
    pub element: usize,
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Glyph {
    pub text: String,
    pub bbox: BBox,
    /// Baseline origin in user space
    pub origin: (f32, f32),
    /// Rendered font height in user space
    pub height: f32,
    /// `None` for synthetic spaces inferred from positioning
    pub source: Option<GlyphSource>,
    /// TJ number that reproduces this glyph's advance when it is removed
    pub removal_adjust: f32,
}

/// A line of text assembled from glyphs sharing a baseline.
#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub text: String,
    /// `(byte start, byte end, glyph index)` for each glyph's slice of `text`
    pub pieces: Vec<(usize, usize, usize)>,
}

/// An image XObject or inline image as painted on the page.
#[derive(Debug, Clone)]
pub struct ImagePlacement {
    pub stream: usize,
    pub op: usize,
    pub bbox: BBox,
}

/// A content stream that contributed to the page.
#[derive(Debug, Clone)]
pub struct StreamLayout {
    /// The form XObject it belongs to; `None` for the page contents
    pub form: Option<ObjectId>,
    pub content: ContentStream,
    /// Streams whose `Do` paints this form
    pub invoked_from: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    /// Page contents first, then each form in first-painted order
    pub streams: Vec<StreamLayout>,
    pub glyphs: Vec<Glyph>,
    pub lines: Vec<TextLine>,
    pub images: Vec<ImagePlacement>,
}

impl PageLayout {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One box per literal occurrence of `needle` within a line.
    pub fn search(&self, needle: &str) -> Vec<BBox> {
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for line in &self.lines {
            for (start, matched) in line.text.match_indices(needle) {
                let end = start + matched.len();
                let bbox = line
                    .pieces
                    .iter()
                    .filter(|(s, e, _)| *s < end && *e > start)
                    .map(|(_, _, g)| self.glyphs[*g].bbox)
                    .reduce(|acc, b| acc.union(&b));
                if let Some(bbox) = bbox {
                    hits.push(bbox);
                }
            }
        }
        hits
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: [f32; 6],
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum XObjectKind {
    Image,
    Form(ObjectId),
    Other,
}

/// Fonts and XObjects visible to one content stream.
struct Resources<'a> {
    fonts: HashMap<Vec<u8>, FontInfo<'a>>,
    xobjects: HashMap<Vec<u8>, XObjectKind>,
}

impl<'a> Resources<'a> {
    fn load(doc: &'a Document, dict: Option<&'a Dictionary>) -> Self {
        let Some(dict) = dict else {
            return Self {
                fonts: HashMap::new(),
                xobjects: HashMap::new(),
            };
        };
        let mut xobjects = HashMap::new();
        if let Some(entries) = dict.get(b"XObject").ok().and_then(|o| resolve_dict(doc, o)) {
            for (name, obj) in entries.iter() {
                let subtype = resolve_dict(doc, obj).and_then(|d| d.get(b"Subtype").ok());
                let kind = match (subtype, obj) {
                    (Some(Object::Name(n)), _) if n == b"Image" => XObjectKind::Image,
                    // forms are rewritten by object id, so only referenced ones count
                    (Some(Object::Name(n)), Object::Reference(id)) if n == b"Form" => {
                        XObjectKind::Form(*id)
                    }
                    _ => XObjectKind::Other,
                };
                xobjects.insert(name.clone(), kind);
            }
        }
        Self {
            fonts: fonts_in(doc, dict),
            xobjects,
        }
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    fallback_font: FontInfo<'a>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    glyphs: Vec<Glyph>,
    placements: Vec<ImagePlacement>,
    streams: Vec<StreamLayout>,
    /// Forms currently being interpreted, innermost last
    active_forms: Vec<ObjectId>,
}

impl<'a> Interpreter<'a> {
    fn font<'r>(&'r self, resources: &'r Resources<'a>) -> &'r FontInfo<'a> {
        self.state
            .font
            .as_ref()
            .and_then(|name| resources.fonts.get(name))
            .unwrap_or(&self.fallback_font)
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
    }

    fn text_to_user(&self) -> [f32; 6] {
        multiply(&self.text_matrix, &self.state.ctm)
    }

    fn show_string(
        &mut self,
        resources: &Resources<'a>,
        bytes: &[u8],
        stream: usize,
        op: usize,
        element: usize,
    ) {
        let fs = self.state.font_size;
        let th = self.state.horizontal_scale;
        let tc = self.state.char_spacing;
        let tw = self.state.word_spacing;
        let rise = self.state.rise;

        let codes = self.font(resources).codes(bytes);
        for (code, start, len) in codes {
            let (w0, text, word_space) = {
                let font = self.font(resources);
                (
                    font.width(code) / 1000.0,
                    font.decode(code),
                    font.is_word_space(code, len),
                )
            };
            let spacing = tc + if word_space { tw } else { 0.0 };
            let m = self.text_to_user();
            let bbox = quad_bbox(&m, 0.0, rise + DESCENT * fs, w0 * fs * th, rise + ASCENT * fs);
            let origin = transform_point(&m, 0.0, rise);
            let removal_adjust = if fs.abs() > f32::EPSILON {
                -(w0 * fs + spacing) * 1000.0 / fs
            } else {
                0.0
            };
            self.glyphs.push(Glyph {
                text,
                bbox,
                origin,
                height: user_height(&m, fs),
                source: Some(GlyphSource {
                    stream,
                    op,
                    element,
                    start,
                    len,
                }),
                removal_adjust,
            });
            self.advance((w0 * fs + spacing) * th);
        }
    }

    fn adjust(&mut self, amount: f32) {
        let fs = self.state.font_size;
        let tx = -amount / 1000.0 * fs * self.state.horizontal_scale;
        if amount < TJ_SPACE_THRESHOLD {
            let m = self.text_to_user();
            let rise = self.state.rise;
            self.glyphs.push(Glyph {
                text: " ".to_string(),
                bbox: quad_bbox(&m, 0.0, rise + DESCENT * fs, tx, rise + ASCENT * fs),
                origin: transform_point(&m, 0.0, rise),
                height: user_height(&m, fs),
                source: None,
                removal_adjust: 0.0,
            });
        }
        self.advance(tx);
    }

    fn place_image(&mut self, stream: usize, op: usize) {
        let m = self.state.ctm;
        self.placements.push(ImagePlacement {
            stream,
            op,
            bbox: quad_bbox(&m, 0.0, 0.0, 1.0, 1.0),
        });
    }

    /// Registers the form's stream once per page and interprets it.
    fn run_form(&mut self, id: ObjectId, parent: usize, parent_resources: &Resources<'a>) -> Result<()> {
        if self.active_forms.contains(&id) || self.active_forms.len() >= MAX_FORM_DEPTH {
            log::warn!("[Layout] skipping form {:?}: cyclic or too deeply nested", id);
            return Ok(());
        }
        let doc = self.doc;
        let Ok(Object::Stream(form)) = doc.get_object(id) else {
            return Ok(());
        };

        let index = match self.streams.iter().position(|s| s.form == Some(id)) {
            Some(index) => {
                if !self.streams[index].invoked_from.contains(&parent) {
                    self.streams[index].invoked_from.push(parent);
                }
                index
            }
            None => {
                let content = ContentStream::decode(&get_stream_content(form))?;
                self.streams.push(StreamLayout {
                    form: Some(id),
                    content,
                    invoked_from: vec![parent],
                });
                self.streams.len() - 1
            }
        };
        let operations = self.streams[index].content.operations.clone();

        let matrix = match form.dict.get(b"Matrix").map(|m| resolve(doc, m)) {
            Ok(Object::Array(m)) => numbers::<6>(m).unwrap_or(IDENTITY),
            _ => IDENTITY,
        };
        let own = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(doc, r))
            .map(|d| Resources::load(doc, Some(d)));

        let saved = self.state.clone();
        let depth = self.stack.len();
        self.state.ctm = multiply(&matrix, &self.state.ctm);
        self.active_forms.push(id);
        let result = self.run(index, own.as_ref().unwrap_or(parent_resources), &operations);
        self.active_forms.pop();
        self.stack.truncate(depth);
        self.state = saved;
        result
    }

    fn run(&mut self, stream: usize, resources: &Resources<'a>, operations: &[Operation]) -> Result<()> {
        for (index, op) in operations.iter().enumerate() {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = numbers::<6>(operands) {
                        self.state.ctm = multiply(&m, &self.state.ctm);
                    }
                }
                "BT" => {
                    self.text_matrix = IDENTITY;
                    self.line_matrix = IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.state.font = Some(name.clone());
                    }
                    if let Some(size) = operands.get(1).and_then(get_number) {
                        self.state.font_size = size;
                    }
                }
                "Tc" => {
                    if let Some([v]) = numbers::<1>(operands) {
                        self.state.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some([v]) = numbers::<1>(operands) {
                        self.state.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some([v]) = numbers::<1>(operands) {
                        self.state.horizontal_scale = v / 100.0;
                    }
                }
                "TL" => {
                    if let Some([v]) = numbers::<1>(operands) {
                        self.state.leading = v;
                    }
                }
                "Ts" => {
                    if let Some([v]) = numbers::<1>(operands) {
                        self.state.rise = v;
                    }
                }
                "Td" => {
                    if let Some([tx, ty]) = numbers::<2>(operands) {
                        self.next_line(tx, ty);
                    }
                }
                "TD" => {
                    if let Some([tx, ty]) = numbers::<2>(operands) {
                        self.state.leading = -ty;
                        self.next_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = numbers::<6>(operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "T*" => self.next_line(0.0, -self.state.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_string(resources, bytes, stream, index, 0);
                    }
                }
                "'" => {
                    self.next_line(0.0, -self.state.leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_string(resources, bytes, stream, index, 0);
                    }
                }
                "\"" => {
                    if let Some([aw, ac]) = numbers::<2>(operands) {
                        self.state.word_spacing = aw;
                        self.state.char_spacing = ac;
                    }
                    self.next_line(0.0, -self.state.leading);
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show_string(resources, bytes, stream, index, 0);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for (element, item) in items.iter().enumerate() {
                            match item {
                                Object::String(bytes, _) => {
                                    self.show_string(resources, bytes, stream, index, element)
                                }
                                other => {
                                    if let Some(amount) = get_number(other) {
                                        self.adjust(amount);
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    let kind = match operands.first() {
                        Some(Object::Name(name)) => resources.xobjects.get(name).copied(),
                        _ => None,
                    };
                    match kind {
                        Some(XObjectKind::Image) => self.place_image(stream, index),
                        Some(XObjectKind::Form(id)) => self.run_form(id, stream, resources)?,
                        _ => {}
                    }
                }
                INLINE_IMAGE => self.place_image(stream, index),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Bounding box of the text-space rectangle `(x0, y0)..(x1, y1)` under `m`.
fn quad_bbox(m: &[f32; 6], x0: f32, y0: f32, x1: f32, y1: f32) -> BBox {
    let corners = [
        transform_point(m, x0, y0),
        transform_point(m, x1, y0),
        transform_point(m, x0, y1),
        transform_point(m, x1, y1),
    ];
    let (mut min_x, mut min_y) = corners[0];
    let (mut max_x, mut max_y) = corners[0];
    for (x, y) in &corners[1..] {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    BBox::from_corners(min_x, min_y, max_x, max_y)
}

fn user_height(m: &[f32; 6], font_size: f32) -> f32 {
    // length of the transformed text-space unit vertical
    (m[2] * m[2] + m[3] * m[3]).sqrt() * font_size.abs()
}

/// Groups glyphs into lines by baseline and inserts spaces for visible gaps.
fn build_lines(glyphs: &[Glyph]) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut current = TextLine::default();
    let mut prev: Option<&Glyph> = None;

    for (index, glyph) in glyphs.iter().enumerate() {
        if glyph.text.is_empty() {
            continue;
        }
        if let Some(last) = prev {
            let height = last.height.max(glyph.height).max(1.0);
            let same_line = (glyph.origin.1 - last.origin.1).abs() <= 0.5 * height
                && glyph.bbox.x >= last.bbox.x - height;
            if !same_line {
                lines.push(std::mem::take(&mut current));
            } else {
                let gap = glyph.bbox.x - last.bbox.right();
                let blank = glyph.text.trim().is_empty() || last.text.trim().is_empty();
                if gap > 0.15 * height && !blank {
                    current.text.push(' ');
                }
            }
        }
        if glyph.source.is_none() && current.text.is_empty() {
            continue;
        }
        let start = current.text.len();
        current.text.push_str(&glyph.text);
        current.pieces.push((start, current.text.len(), index));
        prev = Some(glyph);
    }
    if !current.text.is_empty() {
        lines.push(current);
    }
    lines
}

/// Interprets the page's content streams and every form they paint.
pub fn analyze(doc: &Document, page_id: ObjectId) -> Result<PageLayout> {
    let data = get_page_content(doc, page_id)?;
    let content = ContentStream::decode(&data)?;
    let operations = content.operations.clone();
    let resources = Resources::load(doc, page_resources(doc, page_id));

    let mut interpreter = Interpreter {
        doc,
        fallback_font: FontInfo::default(),
        state: GraphicsState::default(),
        stack: Vec::new(),
        text_matrix: IDENTITY,
        line_matrix: IDENTITY,
        glyphs: Vec::new(),
        placements: Vec::new(),
        streams: vec![StreamLayout {
            form: None,
            content,
            invoked_from: Vec::new(),
        }],
        active_forms: Vec::new(),
    };
    interpreter.run(0, &resources, &operations)?;
    let Interpreter {
        glyphs,
        placements,
        streams,
        ..
    } = interpreter;

    let lines = build_lines(&glyphs);
    log::debug!(
        "[Layout] page {:?}: {} streams, {} glyphs, {} lines, {} images",
        page_id,
        streams.len(),
        glyphs.len(),
        lines.len(),
        placements.len()
    );

    Ok(PageLayout {
        streams,
        glyphs,
        lines,
        images: placements,
    })
}
