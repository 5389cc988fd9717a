//! The `redact_pdf` operation shared by the HTTP route and the RPC tool.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scrub_core::{redact_document, RedactError};
use scrub_llm::run_ai_retry_redaction;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct RedactRequest {
    pub pdf_base64: String,
    #[serde(default)]
    pub retry_with_ai: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedactResponse {
    pub redacted_pdf_base64: String,
    pub summary: String,
    pub ai_retry_triggered: bool,
}

pub async fn redact_pdf(state: &AppState, request: RedactRequest) -> Result<RedactResponse, ApiError> {
    let raw = STANDARD
        .decode(request.pdf_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("invalid base64 payload: {e}")))?;

    let recognizer = state.recognizer.clone();
    let (mut bytes, mut summary) =
        tokio::task::spawn_blocking(move || redact_document(&raw, recognizer.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(format!("redaction task failed: {e}")))??;
    tracing::info!(summary = %summary, "document redacted");

    let mut ai_retry_triggered = false;
    if request.retry_with_ai {
        let ai = state.ai.as_ref().ok_or_else(|| {
            RedactError::ExternalService("AI retry requested but no model client is configured".into())
        })?;
        (bytes, summary) = run_ai_retry_redaction(ai.as_ref(), &bytes).await?;
        ai_retry_triggered = true;
    }

    Ok(RedactResponse {
        redacted_pdf_base64: STANDARD.encode(&bytes),
        summary,
        ai_retry_triggered,
    })
}
