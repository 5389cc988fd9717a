//! HTTP and streaming JSON-RPC front end for PDF PII redaction.

pub mod config;
pub mod error;
pub mod routes;
pub mod rpc;
pub mod service;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.any_origin() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the Axum application router
pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .route("/tools/redact_pdf", post(routes::redact_pdf_handler))
        .route("/health", get(routes::health_handler))
        .route("/sse", get(rpc::sse_handler))
        .route("/messages", post(rpc::messages_handler))
        .layer(DefaultBodyLimit::max(config.max_body_mb.saturating_mul(1024 * 1024)))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
