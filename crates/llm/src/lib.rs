//! Optional re-redaction through an external chat-completion model.
//!
//! The already-redacted document is flattened to text, sent to the model with
//! a fixed PII-removal instruction, and the reply is typeset into a new PDF.

pub mod client;
pub mod retry;

pub use client::{ChatClient, TextGenerator, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use retry::{run_ai_retry_redaction, AI_SUMMARY, SYSTEM_PROMPT};

use scrub_core::RedactError;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Missing API key or unusable settings
    #[error("configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx response or a reply without content
    #[error("API error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<LlmError> for RedactError {
    fn from(err: LlmError) -> Self {
        RedactError::ExternalService(err.to_string())
    }
}
