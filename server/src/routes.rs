use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::service::{redact_pdf, RedactRequest, RedactResponse};
use crate::state::AppState;

/// POST /tools/redact_pdf
pub async fn redact_pdf_handler(
    State(state): State<AppState>,
    Json(request): Json<RedactRequest>,
) -> Result<Json<RedactResponse>, ApiError> {
    Ok(Json(redact_pdf(&state, request).await?))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    ner_model: String,
    ai_retry_available: bool,
    sessions: usize,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ner_model: state.recognizer.name().to_string(),
        ai_retry_available: state.ai.is_some(),
        sessions: state.sessions.len(),
    })
}
