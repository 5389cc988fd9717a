use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scrub_core::RedactError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request payload could not be decoded
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Redact(#[from] RedactError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Redact(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "redaction request failed");
        } else {
            tracing::warn!(error = %self, "rejected request");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::BadRequest("bad base64".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RedactError::DocumentFormat("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn redact_errors_keep_their_message() {
        let err = ApiError::from(RedactError::ExternalService("no client".into()));
        assert_eq!(err.to_string(), "external service error: no client");
    }
}
