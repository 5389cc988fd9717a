//! Named-entity recognition for PII redaction.
//!
//! The locator only needs entity spans with a label; any recognizer that can
//! produce them plugs in through [`EntityRecognizer`]. The bundled
//! [`LexiconRecognizer`] is a gazetteer and capitalization model driven by a
//! JSON lexicon.

mod lexicon;
mod tokens;

pub use lexicon::{Lexicon, LexiconRecognizer};

use serde::{Deserialize, Serialize};

/// Model name that resolves to the embedded English lexicon.
pub const DEFAULT_MODEL: &str = "en_lexicon_sm";

pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    #[error("failed to load NER model: {0}")]
    ModelLoad(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lexicon: {0}")]
    Json(#[from] serde_json::Error),
}

/// A labelled span of the input text (byte offsets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub label: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A loaded NER model.
///
/// Implementations are shared read-only between concurrent requests.
pub trait EntityRecognizer: Send + Sync {
    /// Model identifier, reported by the health endpoint.
    fn name(&self) -> &str;

    /// Entities in text order; spans never overlap.
    fn recognize(&self, text: &str) -> Vec<Entity>;
}

/// Loads a recognizer by model name or lexicon file path.
///
/// `None` and [`DEFAULT_MODEL`] select the embedded English lexicon; anything
/// else is read as a path to a lexicon JSON file.
pub fn load_model(model: Option<&str>) -> Result<LexiconRecognizer> {
    match model {
        None | Some(DEFAULT_MODEL) | Some("en") => LexiconRecognizer::english(),
        Some(path) => {
            let path = std::path::Path::new(path);
            if !path.is_file() {
                return Err(NerError::ModelLoad(format!(
                    "no lexicon file at {}",
                    path.display()
                )));
            }
            LexiconRecognizer::from_path(path)
        }
    }
}
