use std::sync::Arc;

use scrub_llm::TextGenerator;
use scrub_ner::EntityRecognizer;

use crate::rpc::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup, read-only afterwards
    pub recognizer: Arc<dyn EntityRecognizer>,
    /// Present only when an API key is configured
    pub ai: Option<Arc<dyn TextGenerator>>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>, ai: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            recognizer,
            ai,
            sessions: SessionRegistry::default(),
        }
    }
}
