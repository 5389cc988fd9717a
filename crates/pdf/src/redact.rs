//! Destructive redaction: glyph removal, image removal and the fill overlay.
//!
//! Forms that lose content are written as page-local copies, so other pages
//! painting the same form keep it intact.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::content::ContentStream;
use crate::layout::{PageLayout, StreamLayout};
use crate::utils::{page_resources, resolve_dict};
use crate::{PdfError, RedactionMark, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub glyphs_removed: usize,
    pub images_removed: usize,
    pub forms_rewritten: usize,
}

/// Removed byte ranges per `(stream, op, element)`, each with its
/// replacement adjustment.
type Removals = HashMap<(usize, usize, usize), BTreeMap<usize, (usize, f32)>>;

fn collect_removals(layout: &PageLayout, marks: &[RedactionMark]) -> Removals {
    let mut removals: Removals = HashMap::new();
    for glyph in &layout.glyphs {
        let Some(source) = glyph.source else {
            continue;
        };
        let (cx, cy) = glyph.bbox.center();
        if marks.iter().any(|m| m.bbox.contains_point(cx, cy)) {
            removals
                .entry((source.stream, source.op, source.element))
                .or_default()
                .insert(source.start, (source.len, glyph.removal_adjust));
        }
    }
    removals
}

/// Splits a shown string into kept substrings and spacing for removed codes.
fn split_string(
    bytes: &[u8],
    format: StringFormat,
    removed: &BTreeMap<usize, (usize, f32)>,
    out: &mut Vec<Object>,
) {
    let mut kept = Vec::new();
    let mut pending_adjust = 0.0f32;
    let mut i = 0;
    while i < bytes.len() {
        if let Some((len, adjust)) = removed.get(&i) {
            if !kept.is_empty() {
                out.push(Object::String(std::mem::take(&mut kept), format));
            }
            pending_adjust += adjust;
            i += (*len).max(1);
            continue;
        }
        if pending_adjust != 0.0 {
            out.push(Object::Real(pending_adjust));
            pending_adjust = 0.0;
        }
        kept.push(bytes[i]);
        i += 1;
    }
    if !kept.is_empty() {
        out.push(Object::String(kept, format));
    }
    if pending_adjust != 0.0 {
        out.push(Object::Real(pending_adjust));
    }
}

fn rewrite_show(
    op: &Operation,
    stream: usize,
    index: usize,
    removals: &Removals,
) -> Option<Vec<Operation>> {
    let string_at = |pos: usize| match op.operands.get(pos) {
        Some(Object::String(bytes, format)) => Some((bytes.as_slice(), *format)),
        _ => None,
    };

    match op.operator.as_str() {
        "Tj" | "'" | "\"" => {
            let removed = removals.get(&(stream, index, 0))?;
            let pos = if op.operator == "\"" { 2 } else { 0 };
            let (bytes, format) = string_at(pos)?;
            let mut array = Vec::new();
            split_string(bytes, format, removed, &mut array);
            let tj = Operation::new("TJ", vec![Object::Array(array)]);
            Some(match op.operator.as_str() {
                "Tj" => vec![tj],
                "'" => vec![Operation::new("T*", vec![]), tj],
                _ => vec![
                    Operation::new("Tw", vec![op.operands[0].clone()]),
                    Operation::new("Tc", vec![op.operands[1].clone()]),
                    Operation::new("T*", vec![]),
                    tj,
                ],
            })
        }
        "TJ" => {
            let Some(Object::Array(items)) = op.operands.first() else {
                return None;
            };
            if !(0..items.len()).any(|e| removals.contains_key(&(stream, index, e))) {
                return None;
            }
            let mut array = Vec::with_capacity(items.len());
            for (element, item) in items.iter().enumerate() {
                match (item, removals.get(&(stream, index, element))) {
                    (Object::String(bytes, format), Some(removed)) => {
                        split_string(bytes, *format, removed, &mut array)
                    }
                    _ => array.push(item.clone()),
                }
            }
            Some(vec![Operation::new("TJ", vec![Object::Array(array)])])
        }
        _ => None,
    }
}

/// Fill rectangles drawn over the isolated page content.
fn overlay(marks: &[RedactionMark]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(marks.len() * 5);
    for mark in marks {
        let [r, g, b] = mark.fill;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
        ops.push(Operation::new(
            "re",
            vec![
                Object::Real(mark.bbox.x),
                Object::Real(mark.bbox.y),
                Object::Real(mark.bbox.w),
                Object::Real(mark.bbox.h),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }
    ops
}

/// Copies `stream` into `out` without removed glyphs and dropped images.
fn rewrite_into(
    layout: &StreamLayout,
    stream: usize,
    removals: &Removals,
    dropped: &HashSet<(usize, usize)>,
    out: &mut ContentStream,
) {
    let content = &layout.content;
    for (index, op) in content.operations.iter().enumerate() {
        if dropped.contains(&(stream, index)) {
            continue;
        }
        if let Some(raw) = content.inline_image(index) {
            out.push_inline_image(raw.to_vec());
            continue;
        }
        match rewrite_show(op, stream, index, removals) {
            Some(replacement) => replacement.into_iter().for_each(|op| out.push(op)),
            None => out.push(op.clone()),
        }
    }
}

/// `resources` with XObject entries pointing at form copies, if any changed.
fn redirect(
    doc: &Document,
    resources: &Dictionary,
    copies: &HashMap<ObjectId, ObjectId>,
) -> Option<Dictionary> {
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve_dict(doc, o))?;
    let mut updated = xobjects.clone();
    let mut changed = false;
    for (_, value) in updated.iter_mut() {
        if let Object::Reference(id) = value {
            if let Some(copy) = copies.get(id) {
                *value = Object::Reference(*copy);
                changed = true;
            }
        }
    }
    if !changed {
        return None;
    }
    let mut resources = resources.clone();
    resources.set("XObject", Object::Dictionary(updated));
    Some(resources)
}

/// Streams that must be rewritten: those losing content, plus every stream
/// painting one of them.
fn touched_streams(
    layout: &PageLayout,
    removals: &Removals,
    dropped: &HashSet<(usize, usize)>,
) -> BTreeSet<usize> {
    let mut touched: BTreeSet<usize> = removals
        .keys()
        .map(|(stream, _, _)| *stream)
        .chain(dropped.iter().map(|(stream, _)| *stream))
        .collect();
    let mut queue: Vec<usize> = touched.iter().copied().collect();
    while let Some(stream) = queue.pop() {
        for parent in &layout.streams[stream].invoked_from {
            if touched.insert(*parent) {
                queue.push(*parent);
            }
        }
    }
    touched
}

/// Writes a page-local copy of the form painted by stream `index`.
fn copy_form(
    doc: &Document,
    layout: &PageLayout,
    index: usize,
    form_id: ObjectId,
    removals: &Removals,
    dropped: &HashSet<(usize, usize)>,
    copies: &HashMap<ObjectId, ObjectId>,
) -> Result<Stream> {
    let original = match doc.get_object(form_id) {
        Ok(Object::Stream(stream)) => stream,
        _ => return Err(PdfError::Content(format!("form {form_id:?} is not a stream"))),
    };
    let mut dict = original.dict.clone();
    // the copy is written uncompressed
    dict.remove(b"Filter");
    dict.remove(b"DecodeParms");
    if let Some(redirected) = dict
        .get(b"Resources")
        .ok()
        .and_then(|r| resolve_dict(doc, r))
        .and_then(|r| redirect(doc, r, copies))
    {
        dict.set("Resources", Object::Dictionary(redirected));
    }

    let mut content = ContentStream::default();
    rewrite_into(&layout.streams[index], index, removals, dropped, &mut content);
    Ok(Stream::new(dict, content.encode()?))
}

/// Rewrites the page content so nothing under `marks` survives, then paints them.
pub fn apply(
    doc: &mut Document,
    page_id: ObjectId,
    layout: &PageLayout,
    marks: &[RedactionMark],
) -> Result<RewriteStats> {
    let mut stats = RewriteStats::default();
    if marks.is_empty() {
        return Ok(stats);
    }
    let Some(page_stream) = layout.streams.first() else {
        return Err(PdfError::Content("page layout has no content stream".into()));
    };

    let removals = collect_removals(layout, marks);
    stats.glyphs_removed = removals.values().map(BTreeMap::len).sum();

    let dropped: HashSet<(usize, usize)> = layout
        .images
        .iter()
        .filter(|img| marks.iter().any(|m| m.bbox.overlaps(&img.bbox)))
        .map(|img| (img.stream, img.op))
        .collect();
    stats.images_removed = dropped.len();

    let forms: Vec<(usize, ObjectId)> = touched_streams(layout, &removals, &dropped)
        .into_iter()
        .filter_map(|index| layout.streams[index].form.map(|id| (index, id)))
        .collect();
    let copies: HashMap<ObjectId, ObjectId> = forms
        .iter()
        .map(|(_, id)| (*id, doc.new_object_id()))
        .collect();
    for (index, form_id) in &forms {
        let copy = copy_form(doc, layout, *index, *form_id, &removals, &dropped, &copies)?;
        if let Some(copy_id) = copies.get(form_id) {
            doc.objects.insert(*copy_id, Object::Stream(copy));
        }
    }
    stats.forms_rewritten = forms.len();

    let mut content = ContentStream::default();
    content.push(Operation::new("q", vec![]));
    rewrite_into(page_stream, 0, &removals, &dropped, &mut content);
    content.push(Operation::new("Q", vec![]));
    overlay(marks).into_iter().for_each(|op| content.push(op));
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let resources = if copies.is_empty() {
        None
    } else {
        page_resources(doc, page_id).and_then(|r| redirect(doc, r, &copies))
    };
    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfError::Content(e.to_string()))?;
    page.set("Contents", Object::Reference(content_id));
    if let Some(resources) = resources {
        page.set("Resources", Object::Dictionary(resources));
    }

    log::info!(
        "[Redact] page {:?}: {} marks, {} glyphs removed, {} images removed, {} forms rewritten",
        page_id,
        marks.len(),
        stats.glyphs_removed,
        stats.images_removed,
        stats.forms_rewritten
    );
    Ok(stats)
}
