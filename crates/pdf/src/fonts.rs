//! Font metrics and code-to-text decoding for page fonts.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Encoding, Object};

use crate::utils::{get_number, resolve, resolve_dict};

/// Helvetica advance widths (1/1000 em) for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48..63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64..79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80..95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96..111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112..126
];

const HELVETICA_DEFAULT: u16 = 556;
const COURIER_WIDTH: f32 = 600.0;

/// Helvetica advance width of `ch` in 1/1000 em.
pub fn helvetica_width(ch: char) -> u16 {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        HELVETICA_WIDTHS[(code - 32) as usize]
    } else {
        HELVETICA_DEFAULT
    }
}

#[derive(Debug, Clone)]
enum Metrics {
    Simple {
        first_char: u32,
        widths: Vec<f32>,
        missing: Option<f32>,
        monospace: bool,
    },
    Composite {
        widths: HashMap<u32, f32>,
        default: f32,
    },
}

/// What the layout engine needs from a font.
#[derive(Debug)]
pub struct FontInfo<'a> {
    metrics: Metrics,
    encoding: Option<Encoding<'a>>,
    code_bytes: usize,
}

impl Default for FontInfo<'_> {
    fn default() -> Self {
        Self {
            metrics: Metrics::Simple {
                first_char: 0,
                widths: Vec::new(),
                missing: None,
                monospace: false,
            },
            encoding: None,
            code_bytes: 1,
        }
    }
}

/// The font's text encoding as lopdf reads it.
///
/// lopdf only accepts dictionaries typed `/Font`, and with neither `Encoding`
/// nor `ToUnicode` it can only guess; both cases decode as Latin-1 instead.
fn encoding_of<'a>(doc: &'a Document, dict: &'a Dictionary) -> Option<Encoding<'a>> {
    if !dict.type_is(b"Font") || !(dict.has(b"Encoding") || dict.has(b"ToUnicode")) {
        return None;
    }
    match dict.get_font_encoding(doc) {
        Ok(encoding) => Some(encoding),
        Err(e) => {
            log::debug!("[Fonts] no usable encoding, decoding as Latin-1: {}", e);
            None
        }
    }
}

impl<'a> FontInfo<'a> {
    pub fn from_dict(doc: &'a Document, dict: &'a Dictionary) -> Self {
        let encoding = encoding_of(doc, dict);

        let subtype = name_of(dict.get(b"Subtype").ok());
        if subtype.as_deref() == Some("Type0") {
            return Self {
                metrics: composite_metrics(doc, dict),
                encoding,
                code_bytes: 2,
            };
        }

        let base = name_of(dict.get(b"BaseFont").ok()).unwrap_or_default();
        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| get_number(resolve(doc, o)))
            .unwrap_or(0.0) as u32;
        let widths = match dict.get(b"Widths").map(|o| resolve(doc, o)) {
            Ok(Object::Array(arr)) => arr
                .iter()
                .map(|w| get_number(resolve(doc, w)).unwrap_or(0.0))
                .collect(),
            _ => Vec::new(),
        };
        let missing = dict
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve_dict(doc, d))
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|w| get_number(resolve(doc, w)));

        Self {
            metrics: Metrics::Simple {
                first_char,
                widths,
                missing,
                monospace: base.contains("Courier"),
            },
            encoding,
            code_bytes: 1,
        }
    }

    /// Splits a shown string into character codes with their byte offsets.
    pub fn codes(&self, bytes: &[u8]) -> Vec<(u32, usize, usize)> {
        let step = self.code_bytes.max(1);
        bytes
            .chunks(step)
            .enumerate()
            .map(|(i, chunk)| {
                let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                (code, i * step, chunk.len())
            })
            .collect()
    }

    /// Whether word spacing applies to this code (single-byte code 32 only).
    pub fn is_word_space(&self, code: u32, len: usize) -> bool {
        len == 1 && code == 32
    }

    /// Advance width in 1/1000 text space units.
    pub fn width(&self, code: u32) -> f32 {
        match &self.metrics {
            Metrics::Simple {
                first_char,
                widths,
                missing,
                monospace,
            } => {
                if code >= *first_char {
                    if let Some(w) = widths.get((code - first_char) as usize) {
                        return *w;
                    }
                }
                if let Some(w) = missing.filter(|w| *w > 0.0) {
                    return w;
                }
                if *monospace {
                    COURIER_WIDTH
                } else {
                    char::from_u32(code)
                        .map(helvetica_width)
                        .unwrap_or(HELVETICA_DEFAULT) as f32
                }
            }
            Metrics::Composite { widths, default } => widths.get(&code).copied().unwrap_or(*default),
        }
    }

    pub fn decode(&self, code: u32) -> String {
        let bytes = code.to_be_bytes();
        // ToUnicode maps are keyed by 16-bit codes, even for one-byte fonts
        let width = match self.encoding {
            Some(Encoding::UnicodeMapEncoding(_)) => 2,
            _ => self.code_bytes.min(4),
        };
        let bytes = &bytes[4 - width..];
        if let Some(text) = self
            .encoding
            .as_ref()
            .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
            .filter(|text| !text.is_empty() && text != "\u{fffd}")
        {
            return text;
        }
        if self.code_bytes == 1 {
            // Latin-1 fallback
            return char::from_u32(code).map(String::from).unwrap_or_default();
        }
        char::from_u32(code)
            .filter(|c| !c.is_control())
            .map(String::from)
            .unwrap_or_default()
    }
}

fn name_of(obj: Option<&Object>) -> Option<String> {
    match obj? {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn composite_metrics(doc: &Document, dict: &Dictionary) -> Metrics {
    let descendant = match dict.get(b"DescendantFonts").map(|o| resolve(doc, o)) {
        Ok(Object::Array(arr)) => arr.first().and_then(|d| resolve_dict(doc, d)),
        _ => None,
    };
    let Some(descendant) = descendant else {
        return Metrics::Composite {
            widths: HashMap::new(),
            default: 1000.0,
        };
    };

    let default = descendant
        .get(b"DW")
        .ok()
        .and_then(|o| get_number(resolve(doc, o)))
        .unwrap_or(1000.0);

    let mut widths = HashMap::new();
    if let Ok(Object::Array(w)) = descendant.get(b"W").map(|o| resolve(doc, o)) {
        // entries are either `c [w1 w2 ...]` or `c_first c_last w`
        let mut i = 0;
        while i < w.len() {
            let Some(first) = get_number(resolve(doc, &w[i])) else {
                break;
            };
            let first = first as u32;
            match w.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    for (offset, width) in list.iter().enumerate() {
                        if let Some(width) = get_number(resolve(doc, width)) {
                            widths.insert(first + offset as u32, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) = (
                        get_number(last),
                        w.get(i + 2).and_then(|o| get_number(resolve(doc, o))),
                    ) else {
                        break;
                    };
                    for code in first..=(last as u32).min(first.saturating_add(0xFFFF)) {
                        widths.insert(code, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    Metrics::Composite { widths, default }
}

/// Fonts declared in a resource dictionary, keyed by resource name.
pub fn fonts_in<'a>(doc: &'a Document, resources: &'a Dictionary) -> HashMap<Vec<u8>, FontInfo<'a>> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = resources.get(b"Font").ok().and_then(|o| resolve_dict(doc, o)) else {
        return fonts;
    };
    for (name, obj) in font_dict.iter() {
        if let Some(dict) = resolve_dict(doc, obj) {
            fonts.insert(name.clone(), FontInfo::from_dict(doc, dict));
        }
    }
    fonts
}
