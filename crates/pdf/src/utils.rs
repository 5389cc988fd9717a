use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::{PdfError, Result};

/// Numeric value of an operand.
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// First `N` operands as numbers, or `None` if any is missing or non-numeric.
pub fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = get_number(obj)?;
    }
    Some(out)
}

/// Follows indirect references (bounded, to survive reference cycles).
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    for _ in 0..8 {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Decoded stream data, falling back to the raw bytes for unknown filters.
pub fn get_stream_content(stream: &Stream) -> Vec<u8> {
    match stream.decompressed_content() {
        Ok(data) => data,
        Err(_) => stream.content.clone(),
    }
}

/// Concatenated content streams of a page.
pub fn get_page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| PdfError::Content(e.to_string()))?;

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        // a page without content is blank, not broken
        Err(_) => return Ok(Vec::new()),
    };

    match resolve(doc, contents) {
        Object::Stream(stream) => Ok(get_stream_content(stream)),
        Object::Array(parts) => {
            let mut all_content = Vec::new();
            for part in parts {
                if let Object::Stream(stream) = resolve(doc, part) {
                    all_content.extend(get_stream_content(stream));
                    all_content.push(b'\n');
                }
            }
            Ok(all_content)
        }
        _ => Err(PdfError::Content("Contents is neither a stream nor an array".into())),
    }
}

/// Looks up an inheritable page attribute, walking the `Parent` chain.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok());
    for _ in 0..32 {
        let dict = node?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        node = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| resolve_dict(doc, parent));
    }
    None
}

/// The page's effective resource dictionary, inherited if need be.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    resolve_dict(doc, inherited(doc, page_id, b"Resources")?)
}

/// Row-vector affine matrix product `a × b`.
pub fn multiply(a: &[f32; 6], b: &[f32; 6]) -> [f32; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

pub fn transform_point(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

pub const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_reads_mixed_operands() {
        let ops = vec![Object::Integer(2), Object::Real(0.5), Object::Integer(7)];
        assert_eq!(numbers::<2>(&ops), Some([2.0, 0.5]));
        assert_eq!(numbers::<4>(&ops), None);
        assert_eq!(numbers::<1>(&[Object::Name(b"F1".to_vec())]), None);
    }

    #[test]
    fn multiply_applies_left_then_right() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let shift = [1.0, 0.0, 0.0, 1.0, 10.0, 5.0];
        // scale first, then translate
        let m = multiply(&scale, &shift);
        assert_eq!(transform_point(&m, 1.0, 1.0), (12.0, 7.0));
        let m = multiply(&shift, &scale);
        assert_eq!(transform_point(&m, 1.0, 1.0), (22.0, 12.0));
    }
}
