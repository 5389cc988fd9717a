//! SSE transport: one event stream per client plus a POST inbox.
//!
//! GET /sse opens the stream and announces the client's inbox URL in an
//! `endpoint` event. Requests POSTed there are answered on the stream as
//! `message` events.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use super::dispatch::handle_message;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    client_id: String,
}

/// GET /sse
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (guard, rx) = state.sessions.register();
    let endpoint = format!("/messages?client_id={}", guard.id());
    tracing::info!(client_id = %guard.id(), "stream opened");

    let announce = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });

    // Owns the guard: dropping the stream unregisters the client.
    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        let event = Event::default().event("message").data(message);
        Some((Ok::<_, Infallible>(event), (rx, guard)))
    });

    Sse::new(announce.chain(messages)).keep_alive(KeepAlive::default())
}

/// POST /messages?client_id=<id>
pub async fn messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: String,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let sender = state.sessions.sender(&query.client_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": format!("unknown client_id: {}", query.client_id) })),
        )
    })?;

    let client_id = query.client_id;
    tokio::spawn(async move {
        let Some(response) = handle_message(&state, &body).await else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(payload) => {
                if sender.send(payload).await.is_err() {
                    tracing::debug!(client_id = %client_id, "client left before reply");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to encode rpc response"),
        }
    });

    Ok(StatusCode::ACCEPTED)
}
