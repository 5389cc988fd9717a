//! Lexicon-driven recognizer for PERSON / GPE / ORG / LOC.
//!
//! Recognition runs over spans of capitalized words:
//! - leading and trailing stopwords are trimmed off a span
//! - a span ending in an organization suffix is an ORG
//! - a span found whole in a gazetteer takes that gazetteer's label
//! - a span ending in a location suffix is a LOC
//! - otherwise the span is segmented into gazetteer hits and person names
//!   (honorific or known given name followed by capitalized words)

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::tokens::{tokenize, Token};
use crate::{Entity, EntityRecognizer, Result};

static EMBEDDED_EN: &str = include_str!("../data/en_lexicon.json");

/// Lowercase words allowed inside a capitalized span.
const CONNECTORS: &[&str] = &["of", "&", "the", "for", "de", "du", "del", "da", "la", "van", "von"];
/// Abbreviations that may be followed by a period inside a name.
const ABBREVIATIONS: &[&str] = &["st", "mt", "ft", "jr", "sr"];
const MAX_PERSON_TOKENS: usize = 3;

/// On-disk lexicon format.
#[derive(Debug, Clone, Deserialize)]
pub struct Lexicon {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default = "default_max_span")]
    pub max_span_tokens: usize,
    #[serde(default)]
    pub gpe: Vec<String>,
    #[serde(default)]
    pub loc: Vec<String>,
    #[serde(default)]
    pub org: Vec<String>,
    #[serde(default)]
    pub given_names: Vec<String>,
    #[serde(default)]
    pub honorifics: Vec<String>,
    #[serde(default)]
    pub org_suffixes: Vec<String>,
    #[serde(default)]
    pub loc_suffixes: Vec<String>,
    #[serde(default)]
    pub stopwords: Vec<String>,
}

fn default_max_span() -> usize {
    6
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Person,
    Gpe,
    Org,
    Loc,
}

impl Label {
    fn as_str(self) -> &'static str {
        match self {
            Label::Person => "PERSON",
            Label::Gpe => "GPE",
            Label::Org => "ORG",
            Label::Loc => "LOC",
        }
    }
}

#[derive(Debug)]
pub struct LexiconRecognizer {
    name: String,
    /// Lowercased, space-joined phrase tokens → label
    gazetteer: HashMap<String, Label>,
    max_phrase_tokens: usize,
    given_names: HashSet<String>,
    honorifics: HashSet<String>,
    org_suffixes: HashSet<String>,
    loc_suffixes: HashSet<String>,
    stopwords: HashSet<String>,
}

fn lowered(words: &[String]) -> HashSet<String> {
    words.iter().map(|w| w.trim_end_matches('.').to_lowercase()).collect()
}

fn phrase_key(phrase: &str) -> String {
    tokenize(phrase)
        .iter()
        .map(Token::lower)
        .collect::<Vec<_>>()
        .join(" ")
}

impl LexiconRecognizer {
    pub fn from_lexicon(lexicon: Lexicon) -> Self {
        let mut gazetteer = HashMap::new();
        let mut max_phrase_tokens = 1;
        // later lists win on conflict: ORG over LOC over GPE
        for (label, phrases) in [
            (Label::Gpe, &lexicon.gpe),
            (Label::Loc, &lexicon.loc),
            (Label::Org, &lexicon.org),
        ] {
            for phrase in phrases {
                let key = phrase_key(phrase);
                if key.is_empty() {
                    continue;
                }
                max_phrase_tokens = max_phrase_tokens.max(key.split(' ').count());
                gazetteer.insert(key, label);
            }
        }

        log::info!(
            "[NER] loaded lexicon {} ({} gazetteer phrases, {} given names)",
            lexicon.name,
            gazetteer.len(),
            lexicon.given_names.len()
        );

        Self {
            name: lexicon.name.clone(),
            gazetteer,
            max_phrase_tokens: max_phrase_tokens.min(lexicon.max_span_tokens.max(1)),
            given_names: lowered(&lexicon.given_names),
            honorifics: lowered(&lexicon.honorifics),
            org_suffixes: lowered(&lexicon.org_suffixes),
            loc_suffixes: lowered(&lexicon.loc_suffixes),
            stopwords: lowered(&lexicon.stopwords),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let lexicon: Lexicon = serde_json::from_str(json)?;
        Ok(Self::from_lexicon(lexicon))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The embedded English lexicon.
    pub fn english() -> Result<Self> {
        Self::from_json(EMBEDDED_EN)
    }

    fn is_connector(token: &Token<'_>) -> bool {
        CONNECTORS.contains(&token.text)
    }

    fn is_abbreviation(&self, token: &Token<'_>) -> bool {
        let lower = token.lower();
        token.text.chars().count() == 1
            || self.honorifics.contains(&lower)
            || ABBREVIATIONS.contains(&lower.as_str())
    }

    /// Whether two tokens may belong to the same name on one line.
    fn joinable(&self, text: &str, prev: &Token<'_>, next: &Token<'_>) -> bool {
        let sep = &text[prev.end..next.start];
        if sep.is_empty() || sep.contains('\n') || sep.contains('\r') {
            return false;
        }
        if sep.chars().all(char::is_whitespace) {
            return true;
        }
        match sep.strip_prefix('.') {
            Some(rest) => {
                !rest.is_empty()
                    && rest.chars().all(char::is_whitespace)
                    && self.is_abbreviation(prev)
            }
            None => false,
        }
    }

    /// Groups tokens into maximal capitalized spans (token index ranges).
    fn capitalized_spans(&self, text: &str, tokens: &[Token<'_>]) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            if !tokens[i].is_capitalized() {
                i += 1;
                continue;
            }
            let start = i;
            let mut end = i + 1;
            while end < tokens.len() {
                let next = &tokens[end];
                if !self.joinable(text, &tokens[end - 1], next) {
                    break;
                }
                if next.is_capitalized() {
                    end += 1;
                    continue;
                }
                // a connector only joins when capitalized words follow it
                let bridged = Self::is_connector(next)
                    && self.bridges(&tokens[end - 1], next)
                    && tokens
                        .get(end + 1)
                        .is_some_and(|after| after.is_capitalized() && self.joinable(text, next, after));
                if bridged {
                    end += 2;
                } else {
                    break;
                }
            }
            spans.push((start, end));
            i = end;
        }
        spans
    }

    /// `of` only links names headed by an institution or place word.
    fn bridges(&self, prev: &Token<'_>, connector: &Token<'_>) -> bool {
        if connector.text != "of" {
            return true;
        }
        let lower = prev.lower();
        self.org_suffixes.contains(&lower)
            || self.loc_suffixes.contains(&lower)
            || self.is_gazetteer_head(&lower)
    }

    fn is_gazetteer_head(&self, lower: &str) -> bool {
        // e.g. "gulf" in "gulf of mexico"
        self.gazetteer
            .keys()
            .any(|k| k.starts_with(lower) && k[lower.len()..].starts_with(" of "))
    }

    fn lookup(&self, tokens: &[Token<'_>]) -> Option<Label> {
        let key = tokens.iter().map(Token::lower).collect::<Vec<_>>().join(" ");
        self.gazetteer.get(&key).copied()
    }

    /// Longest gazetteer phrase starting at `tokens[0]`, as a token count.
    fn longest_match(&self, tokens: &[Token<'_>]) -> Option<(usize, Label)> {
        let limit = tokens.len().min(self.max_phrase_tokens);
        (1..=limit)
            .rev()
            .find_map(|n| self.lookup(&tokens[..n]).map(|label| (n, label)))
    }

    fn is_stopword(&self, token: &Token<'_>) -> bool {
        self.stopwords.contains(&token.lower())
    }

    fn is_honorific(&self, token: &Token<'_>) -> bool {
        self.honorifics.contains(&token.lower())
    }

    fn is_given_name(&self, token: &Token<'_>) -> bool {
        self.given_names.contains(&token.lower())
    }

    fn name_part(&self, token: &Token<'_>) -> bool {
        token.is_capitalized() && !Self::is_connector(token) && !self.is_stopword(token)
    }

    fn classify(&self, tokens: &[Token<'_>], out: &mut Vec<(usize, usize, Label)>) {
        let mut s = 0;
        let mut e = tokens.len();
        while s < e
            && (Self::is_connector(&tokens[s])
                || (self.is_stopword(&tokens[s])
                    && !self.is_honorific(&tokens[s])
                    && self.lookup(&tokens[s..e]).is_none()))
        {
            s += 1;
        }
        while e > s && (Self::is_connector(&tokens[e - 1]) || self.is_stopword(&tokens[e - 1])) {
            e -= 1;
        }
        if s == e {
            return;
        }
        let span = &tokens[s..e];
        let len = span.len();
        let first = span[0].lower();
        let last = span[len - 1].lower();

        if len >= 2 && self.org_suffixes.contains(&last) {
            out.push((s, e, Label::Org));
            return;
        }
        if len >= 3 && self.org_suffixes.contains(&first) && span[1].text == "of" {
            out.push((s, e, Label::Org));
            return;
        }
        if let Some(label) = self.lookup(span) {
            out.push((s, e, label));
            return;
        }
        if len >= 2
            && (self.loc_suffixes.contains(&last)
                || (self.loc_suffixes.contains(&first) && span[1].is_capitalized()))
        {
            out.push((s, e, Label::Loc));
            return;
        }

        let mut i = 0;
        while i < len {
            if self.is_honorific(&span[i]) {
                let names = self.person_run(&span[i + 1..]);
                if names > 0 {
                    out.push((s + i + 1, s + i + 1 + names, Label::Person));
                    i += 1 + names;
                    continue;
                }
            }
            if let Some((n, label)) = self.longest_match(&span[i..]) {
                out.push((s + i, s + i + n, label));
                i += n;
                continue;
            }
            if self.is_given_name(&span[i]) {
                let names = self.person_run(&span[i..]);
                if names >= 2 {
                    out.push((s + i, s + i + names, Label::Person));
                    i += names;
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Count of leading tokens that can form a person name.
    fn person_run(&self, tokens: &[Token<'_>]) -> usize {
        let mut n = 0;
        while n < tokens.len() && n < MAX_PERSON_TOKENS {
            let token = &tokens[n];
            if !self.name_part(token) {
                break;
            }
            // a place or organization after the name ends it
            if n > 0 && self.longest_match(&tokens[n..]).is_some() {
                break;
            }
            n += 1;
        }
        n
    }
}

impl EntityRecognizer for LexiconRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, text: &str) -> Vec<Entity> {
        let tokens = tokenize(text);
        let mut entities = Vec::new();
        for (start, end) in self.capitalized_spans(text, &tokens) {
            let span = &tokens[start..end];
            let mut found = Vec::new();
            self.classify(span, &mut found);
            for (s, e, label) in found {
                let byte_start = span[s].start;
                let byte_end = span[e - 1].end;
                entities.push(Entity {
                    label: label.as_str().to_string(),
                    text: text[byte_start..byte_end].to_string(),
                    start: byte_start,
                    end: byte_end,
                });
            }
        }
        log::debug!("[NER] {} entities in {} bytes", entities.len(), text.len());
        entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LexiconRecognizer {
        LexiconRecognizer::english().expect("embedded lexicon parses")
    }

    fn labelled(text: &str) -> Vec<(String, String)> {
        model()
            .recognize(text)
            .into_iter()
            .map(|e| (e.label, e.text))
            .collect()
    }

    fn pair(label: &str, text: &str) -> (String, String) {
        (label.to_string(), text.to_string())
    }

    #[test]
    fn person_from_given_name() {
        assert_eq!(labelled("Jane Doe"), vec![pair("PERSON", "Jane Doe")]);
        assert_eq!(
            labelled("The report was signed by Michael Smith yesterday."),
            vec![pair("PERSON", "Michael Smith")]
        );
    }

    #[test]
    fn contact_line_has_no_entities() {
        assert!(labelled("Contact john@example.com or 555-123-4567").is_empty());
    }

    #[test]
    fn honorific_person_excludes_title() {
        assert_eq!(labelled("Please ask Dr. Okafor"), vec![pair("PERSON", "Okafor")]);
        assert_eq!(labelled("Dear Mrs Ramirez,"), vec![pair("PERSON", "Ramirez")]);
    }

    #[test]
    fn places_and_organizations() {
        assert_eq!(
            labelled("She moved from Paris to New York with Acme Corp."),
            vec![pair("GPE", "Paris"), pair("GPE", "New York"), pair("ORG", "Acme Corp")]
        );
        assert_eq!(labelled("He works at Bank of America"), vec![pair("ORG", "Bank of America")]);
        assert_eq!(
            labelled("a trip down the Hudson River"),
            vec![pair("LOC", "Hudson River")]
        );
        assert_eq!(labelled("offices across Europe"), vec![pair("LOC", "Europe")]);
    }

    #[test]
    fn abbreviation_period_joins_name() {
        assert_eq!(labelled("born in St. Louis"), vec![pair("GPE", "St. Louis")]);
    }

    #[test]
    fn sentence_break_splits_names() {
        let found = labelled("Call Jane Doe. Michael Smith will answer.");
        assert_eq!(found, vec![pair("PERSON", "Jane Doe"), pair("PERSON", "Michael Smith")]);
    }

    #[test]
    fn person_then_place_in_one_span() {
        assert_eq!(
            labelled("Jane Doe London office"),
            vec![pair("PERSON", "Jane Doe"), pair("GPE", "London")]
        );
    }

    #[test]
    fn offsets_slice_the_input() {
        let text = "Notes: Sarah Connor lives in Texas";
        for entity in model().recognize(text) {
            assert_eq!(&text[entity.start..entity.end], entity.text);
        }
    }

    #[test]
    fn lines_do_not_merge() {
        let found = labelled("Jane\nDoe");
        assert!(found.is_empty());
    }

    #[test]
    fn custom_lexicon_from_json() {
        let json = r#"{"name": "tiny", "gpe": ["Gondor"], "given_names": ["Aragorn"]}"#;
        let model = LexiconRecognizer::from_json(json).expect("parse");
        let found = model.recognize("Aragorn Elessar rules Gondor");
        let labels: Vec<&str> = found.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["PERSON", "GPE"]);
        assert_eq!(model.name(), "tiny");
    }
}
