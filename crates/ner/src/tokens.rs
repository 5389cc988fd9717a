//! Word tokenizer with byte offsets.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'t> {
    pub text: &'t str,
    pub start: usize,
    pub end: usize,
}

impl<'t> Token<'t> {
    pub fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }

    pub fn lower(&self) -> String {
        self.text.to_lowercase()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '&'
}

/// Splits `text` into words.
///
/// Apostrophes, hyphens and periods stay inside a word when a word character
/// follows them (`O'Neil`, `Jean-Luc`, `U.S`, `Amazon.com`); a trailing
/// possessive `'s` is dropped.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if !is_word_char(c) {
            continue;
        }
        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if is_word_char(next) {
                end = i + next.len_utf8();
                chars.next();
                continue;
            }
            if matches!(next, '\'' | '-' | '.') {
                let after = text[i + 1..].chars().next();
                if after.is_some_and(|a| a.is_alphanumeric()) {
                    end = i + 1;
                    chars.next();
                    continue;
                }
            }
            break;
        }
        let mut word = &text[start..end];
        if word.len() > 2 && word.ends_with("'s") {
            end -= 2;
            word = &text[start..end];
        }
        tokens.push(Token {
            text: word,
            start,
            end,
        });
    }
    tokens
}
