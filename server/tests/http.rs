mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scrub_pdf::PdfDocument;
use serde_json::json;
use tower::ServiceExt;

use common::{app, app_with, json_body, pdf, post_json, CannedGenerator};

fn page_text(bytes: &[u8]) -> String {
    PdfDocument::open(bytes)
        .expect("reopen")
        .extract_text()
        .expect("text")
        .join("\n")
}

#[tokio::test]
async fn redacts_contact_details() {
    let body = json!({ "pdf_base64": STANDARD.encode(pdf(&["Contact john@example.com or 555-123-4567"])) });
    let response = app().oneshot(post_json("/tools/redact_pdf", &body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["summary"], "EMAIL: 1, PHONE: 1");
    assert_eq!(json["ai_retry_triggered"], false);

    let output = STANDARD
        .decode(json["redacted_pdf_base64"].as_str().expect("string"))
        .expect("base64");
    let text = page_text(&output);
    assert!(text.contains("Contact"));
    assert!(!text.contains("john@example.com"));
    assert!(!text.contains("4567"));
}

#[tokio::test]
async fn clean_document_has_empty_summary() {
    let body = json!({ "pdf_base64": STANDARD.encode(pdf(&["quarterly numbers attached"])) });
    let response = app().oneshot(post_json("/tools/redact_pdf", &body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["summary"], "");
}

#[tokio::test]
async fn invalid_base64_is_bad_request() {
    let body = json!({ "pdf_base64": "not base64!!" });
    let response = app().oneshot(post_json("/tools/redact_pdf", &body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["detail"]
        .as_str()
        .expect("detail")
        .contains("base64"));
}

#[tokio::test]
async fn non_pdf_payload_is_server_error() {
    let body = json!({ "pdf_base64": STANDARD.encode(b"hello world") });
    let response = app().oneshot(post_json("/tools/redact_pdf", &body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["detail"]
        .as_str()
        .expect("detail")
        .starts_with("invalid PDF document"));
}

#[tokio::test]
async fn ai_retry_without_client_is_server_error() {
    let body = json!({
        "pdf_base64": STANDARD.encode(pdf(&["Jane Doe"])),
        "retry_with_ai": true
    });
    let response = app().oneshot(post_json("/tools/redact_pdf", &body)).await.expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(response).await["detail"]
        .as_str()
        .expect("detail")
        .starts_with("external service error"));
}

#[tokio::test]
async fn ai_retry_replaces_bytes_and_summary() {
    let generator = CannedGenerator {
        reply: Some("Meeting with [REDACTED]".into()),
    };
    let body = json!({
        "pdf_base64": STANDARD.encode(pdf(&["Meeting with Jane Doe"])),
        "retry_with_ai": true
    });
    let response = app_with(Some(Arc::new(generator)))
        .oneshot(post_json("/tools/redact_pdf", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["summary"], "AI redaction applied");
    assert_eq!(json["ai_retry_triggered"], true);
    let output = STANDARD
        .decode(json["redacted_pdf_base64"].as_str().expect("string"))
        .expect("base64");
    assert_eq!(page_text(&output), "Meeting with [REDACTED]");
}

#[tokio::test]
async fn ai_failure_surfaces_as_server_error() {
    let generator = CannedGenerator { reply: None };
    let body = json!({
        "pdf_base64": STANDARD.encode(pdf(&["Jane Doe"])),
        "retry_with_ai": true
    });
    let response = app_with(Some(Arc::new(generator)))
        .oneshot(post_json("/tools/redact_pdf", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_reports_model_and_ai_availability() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ner_model"], "en_lexicon_sm");
    assert_eq!(json["ai_retry_available"], false);
}

#[tokio::test]
async fn cors_preflight_is_permissive_by_default() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/tools/redact_pdf")
        .header("origin", "https://client.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .expect("request");
    let response = app().oneshot(request).await.expect("response");
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
