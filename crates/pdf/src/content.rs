//! Content streams with inline images held aside.
//!
//! `lopdf` stops parsing at the first `BI … ID … EI` block and returns the
//! operations before it as if they were the whole stream. Inline images are
//! therefore cut out before decoding and kept as raw bytes, and every decoded
//! run is checked against an operator count of its source.

use std::collections::BTreeMap;
use std::ops::Range;

use lopdf::content::{Content, Operation};

use crate::{PdfError, Result};

/// Operator of the placeholder standing in for an inline image.
pub const INLINE_IMAGE: &str = "BI";

#[derive(Debug, Clone, Default)]
pub struct ContentStream {
    pub operations: Vec<Operation>,
    /// Raw `BI … EI` bytes keyed by the index of their placeholder
    pub inline_images: BTreeMap<usize, Vec<u8>>,
}

impl ContentStream {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut stream = ContentStream::default();
        for segment in split(data)? {
            match segment {
                Segment::Operations { range, operators } => {
                    let content = Content::decode(&data[range.clone()])
                        .map_err(|e| PdfError::Content(e.to_string()))?;
                    if content.operations.len() != operators {
                        return Err(PdfError::Content(format!(
                            "content parser stopped after {} of {} operators near byte {}",
                            content.operations.len(),
                            operators,
                            range.start
                        )));
                    }
                    stream.operations.extend(content.operations);
                }
                Segment::InlineImage(range) => stream.push_inline_image(data[range].to_vec()),
            }
        }
        Ok(stream)
    }

    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn push_inline_image(&mut self, raw: Vec<u8>) {
        self.inline_images.insert(self.operations.len(), raw);
        self.operations.push(Operation::new(INLINE_IMAGE, vec![]));
    }

    pub fn inline_image(&self, index: usize) -> Option<&[u8]> {
        self.inline_images.get(&index).map(Vec::as_slice)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut run_start = 0;
        for (index, raw) in &self.inline_images {
            encode_run(&self.operations[run_start..*index], &mut out)?;
            if !out.is_empty() {
                out.push(b'\n');
            }
            out.extend_from_slice(raw);
            out.push(b'\n');
            run_start = index + 1;
        }
        encode_run(&self.operations[run_start..], &mut out)?;
        Ok(out)
    }
}

fn encode_run(operations: &[Operation], out: &mut Vec<u8>) -> Result<()> {
    if operations.is_empty() {
        return Ok(());
    }
    let encoded = Content { operations }
        .encode()
        .map_err(|e| PdfError::Content(e.to_string()))?;
    out.extend(encoded);
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Segment {
    Operations { range: Range<usize>, operators: usize },
    InlineImage(Range<usize>),
}

#[derive(Debug, PartialEq)]
enum Token {
    Keyword(Range<usize>),
    Open,
    Close,
    Operand,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.pos < self.data.len() && !matches!(self.data[self.pos], b'\r' | b'\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn skip_literal_string(&mut self) {
        let mut depth = 0usize;
        while let Some(&b) = self.data.get(self.pos) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'(' => depth += 1,
                b')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_regular(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();
        let b = *self.data.get(self.pos)?;
        let token = match b {
            b'(' => {
                self.skip_literal_string();
                Token::Operand
            }
            b'<' if self.data.get(self.pos + 1) == Some(&b'<') => {
                self.pos += 2;
                Token::Open
            }
            b'>' if self.data.get(self.pos + 1) == Some(&b'>') => {
                self.pos += 2;
                Token::Close
            }
            b'<' => {
                while self.pos < self.data.len() && self.data[self.pos] != b'>' {
                    self.pos += 1;
                }
                self.pos += 1;
                Token::Operand
            }
            b'[' | b'{' => {
                self.pos += 1;
                Token::Open
            }
            b']' | b'}' => {
                self.pos += 1;
                Token::Close
            }
            b'/' => {
                self.pos += 1;
                self.skip_regular();
                Token::Operand
            }
            b')' | b'>' => {
                self.pos += 1;
                Token::Operand
            }
            _ => {
                let start = self.pos;
                self.skip_regular();
                if b.is_ascii_alphabetic() || b == b'\'' || b == b'"' {
                    Token::Keyword(start..self.pos)
                } else {
                    Token::Operand
                }
            }
        };
        Some(token)
    }

    /// Moves past an inline image whose `BI` keyword has just been read.
    fn skip_inline_image(&mut self) -> Result<()> {
        loop {
            match self.next_token() {
                Some(Token::Keyword(range)) if &self.data[range.clone()] == b"ID" => break,
                Some(_) => {}
                None => return Err(PdfError::Content("inline image without ID".into())),
            }
        }
        // exactly one whitespace byte separates ID from the sample data
        if self.data.get(self.pos).copied().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        let data = self.data;
        let mut i = self.pos;
        while i + 1 < data.len() {
            let boundary_before = i == 0 || is_whitespace(data[i - 1]);
            let boundary_after = data
                .get(i + 2)
                .map_or(true, |b| is_whitespace(*b) || is_delimiter(*b));
            if &data[i..i + 2] == b"EI" && boundary_before && boundary_after {
                self.pos = i + 2;
                return Ok(());
            }
            i += 1;
        }
        Err(PdfError::Content("inline image without EI".into()))
    }
}

/// Cuts `data` into operator runs and inline images, counting the operators
/// each run should decode to.
fn split(data: &[u8]) -> Result<Vec<Segment>> {
    let mut lexer = Lexer { data, pos: 0 };
    let mut segments = Vec::new();
    let mut run_start = 0;
    let mut operators = 0;
    let mut depth = 0usize;

    while let Some(token) = lexer.next_token() {
        match token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            Token::Operand => {}
            Token::Keyword(range) => {
                let word = &data[range.clone()];
                if depth > 0 || matches!(word, b"true" | b"false" | b"null") {
                    continue;
                }
                if word == b"BI" {
                    segments.push(Segment::Operations {
                        range: run_start..range.start,
                        operators,
                    });
                    lexer.skip_inline_image()?;
                    segments.push(Segment::InlineImage(range.start..lexer.pos));
                    run_start = lexer.pos;
                    operators = 0;
                } else {
                    operators += 1;
                }
            }
        }
    }
    segments.push(Segment::Operations {
        range: run_start..data.len(),
        operators,
    });
    Ok(segments)
}
