mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{app, json_body, pdf, post_json};

/// Reads body frames until one complete SSE event of `kind` arrives.
async fn next_event(body: &mut Body, kind: &str) -> String {
    let mut buffer = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(10), body.frame())
            .await
            .expect("event in time")
            .expect("stream open")
            .expect("frame");
        let Ok(data) = frame.into_data() else {
            continue;
        };
        buffer.push_str(&String::from_utf8_lossy(&data));
        while let Some(end) = buffer.find("\n\n") {
            let event: String = buffer.drain(..end + 2).collect();
            let field = |line: &str, name: &str| {
                line.strip_prefix(name)
                    .and_then(|rest| rest.strip_prefix(':'))
                    .map(|rest| rest.strip_prefix(' ').unwrap_or(rest).to_string())
            };
            if event.lines().any(|l| field(l, "event").as_deref() == Some(kind)) {
                return event
                    .lines()
                    .filter_map(|l| field(l, "data"))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
        }
    }
}

async fn open_stream(router: &axum::Router) -> (Body, String) {
    let response = router
        .clone()
        .oneshot(Request::get("/sse").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();
    let endpoint = next_event(&mut body, "endpoint").await;
    (body, endpoint)
}

async fn rpc(router: &axum::Router, body: &mut Body, endpoint: &str, message: Value) -> Value {
    let response = router
        .clone()
        .oneshot(post_json(endpoint, &message))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    serde_json::from_str(&next_event(body, "message").await).expect("json-rpc reply")
}

#[tokio::test]
async fn endpoint_event_names_the_inbox() {
    let router = app();
    let (_body, endpoint) = open_stream(&router).await;
    assert!(endpoint.starts_with("/messages?client_id="));
    assert!(endpoint.len() > "/messages?client_id=".len());
}

#[tokio::test]
async fn tool_call_reply_arrives_on_the_stream() {
    let router = app();
    let (mut body, endpoint) = open_stream(&router).await;

    let init = rpc(
        &router,
        &mut body,
        &endpoint,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;
    assert_eq!(init["id"], 1);
    assert!(init["result"]["capabilities"]["tools"].is_object());

    let call = rpc(
        &router,
        &mut body,
        &endpoint,
        json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {
                "name": "redact_pdf",
                "arguments": {"pdf_base64": STANDARD.encode(pdf(&["SSN 123-45-6789"]))}
            }
        }),
    )
    .await;
    assert_eq!(call["id"], 2);
    let result = &call["result"];
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["text"], "SSN: 1");
    assert_eq!(result["structuredContent"]["summary"], "SSN: 1");
    assert_eq!(result["structuredContent"]["ai_retry_triggered"], false);
}

#[tokio::test]
async fn unknown_method_comes_back_as_rpc_error() {
    let router = app();
    let (mut body, endpoint) = open_stream(&router).await;
    let reply = rpc(
        &router,
        &mut body,
        &endpoint,
        json!({"jsonrpc": "2.0", "id": "x", "method": "prompts/list"}),
    )
    .await;
    assert_eq!(reply["error"]["code"], -32601);
    assert_eq!(reply["id"], "x");
}

#[tokio::test]
async fn unknown_client_is_not_found() {
    let response = app()
        .oneshot(post_json(
            "/messages?client_id=nobody",
            &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(json_body(response).await["detail"]
        .as_str()
        .expect("detail")
        .contains("nobody"));
}

#[tokio::test]
async fn closing_the_stream_unregisters_the_client() {
    let router = app();
    let (body, endpoint) = open_stream(&router).await;
    drop(body);

    let response = router
        .oneshot(post_json(
            &endpoint,
            &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
