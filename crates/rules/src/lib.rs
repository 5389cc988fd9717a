//! PII category labels and the fixed regex rule set.
//!
//! The label set and the three pattern definitions are a compatibility
//! contract: downstream consumers parse the summary string by label name.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// PII category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Email,
    Phone,
    Ssn,
    Person,
    Gpe,
    Org,
    Loc,
}

/// How a category is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    /// Fixed regular expression over page text
    Pattern,
    /// Named-entity recognition label
    Entity,
}

impl Category {
    /// Every label in contract order.
    pub const ALL: [Category; 7] = [
        Category::Email,
        Category::Phone,
        Category::Ssn,
        Category::Person,
        Category::Gpe,
        Category::Org,
        Category::Loc,
    ];

    /// NER labels the locator acts on.
    pub const ENTITY_LABELS: [Category; 4] =
        [Category::Person, Category::Gpe, Category::Org, Category::Loc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Email => "EMAIL",
            Category::Phone => "PHONE",
            Category::Ssn => "SSN",
            Category::Person => "PERSON",
            Category::Gpe => "GPE",
            Category::Org => "ORG",
            Category::Loc => "LOC",
        }
    }

    pub fn detector(&self) -> Detector {
        match self {
            Category::Email | Category::Phone | Category::Ssn => Detector::Pattern,
            Category::Person | Category::Gpe | Category::Org | Category::Loc => Detector::Entity,
        }
    }

    /// Maps an NER label to a category, ignoring labels outside the entity set.
    pub fn from_entity_label(label: &str) -> Option<Category> {
        label
            .parse::<Category>()
            .ok()
            .filter(|c| c.detector() == Detector::Entity)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category label: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Source text of the pattern rules, in processing order.
///
/// `[A-Z|a-z]` in the email TLD class admits a literal `|`; kept as-is so
/// results match existing consumers byte for byte.
pub const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b";
pub const PHONE_PATTERN: &str = r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b";
pub const SSN_PATTERN: &str = r"\b\d{3}-\d{2}-\d{4}\b";

/// A compiled pattern rule.
#[derive(Debug)]
pub struct PatternRule {
    pub category: Category,
    pub regex: Regex,
}

impl PatternRule {
    /// All non-overlapping matches in scan order.
    pub fn find_matches<'t>(&self, text: &'t str) -> Vec<PatternMatch<'t>> {
        self.regex
            .find_iter(text)
            .map(|m| PatternMatch {
                category: self.category,
                text: m.as_str(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }
}

/// One regex hit inside page text (byte offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch<'t> {
    pub category: Category,
    pub text: &'t str,
    pub start: usize,
    pub end: usize,
}

static PATTERN_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    [
        (Category::Email, EMAIL_PATTERN),
        (Category::Phone, PHONE_PATTERN),
        (Category::Ssn, SSN_PATTERN),
    ]
    .into_iter()
    .filter_map(|(category, source)| {
        Regex::new(source)
            .map(|regex| PatternRule { category, regex })
            .ok()
    })
    .collect()
});

/// EMAIL, PHONE, SSN rules in that order.
pub fn pattern_rules() -> &'static [PatternRule] {
    &PATTERN_RULES
}
