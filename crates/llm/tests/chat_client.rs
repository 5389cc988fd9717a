use scrub_core::RedactError;
use scrub_llm::{run_ai_retry_redaction, ChatClient, LlmError, AI_SUMMARY};
use scrub_pdf::PdfDocument;
use scrub_render::{render_text_pdf, TextLayout};
use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn client(server: &MockServer) -> ChatClient {
    ChatClient::new("test-key").with_base_url(server.uri())
}

#[tokio::test]
async fn chat_posts_bearer_authorized_request() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/chat/completions"))
        .and(matchers::header("authorization", "Bearer test-key"))
        .and(matchers::body_partial_json(json!({
            "model": "gpt-4",
            "messages": [
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server).chat("sys", "hello").await.expect("chat");
    assert_eq!(reply, "hi there");
}

#[tokio::test]
async fn non_success_status_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = client(&server).chat("s", "u").await.unwrap_err();
    assert!(matches!(err, LlmError::Api(m) if m.contains("rate limited")));
}

#[tokio::test]
async fn empty_choices_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server).chat("s", "u").await.unwrap_err();
    assert!(matches!(err, LlmError::Api(_)));
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).chat("s", "u").await.unwrap_err();
    assert!(matches!(err, LlmError::Parse(_)));
}

#[tokio::test]
async fn retry_rebuilds_document_from_reply() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/chat/completions"))
        .and(matchers::body_string_contains(
            "Redact all PII from this document:\\nMeet Jane Doe",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Meet [NAME]")))
        .expect(1)
        .mount(&server)
        .await;

    let input = render_text_pdf("Meet Jane Doe", &TextLayout::default()).expect("input");
    let (bytes, summary) = run_ai_retry_redaction(&client(&server), &input)
        .await
        .expect("retry");

    assert_eq!(summary, AI_SUMMARY);
    let text = PdfDocument::open(&bytes)
        .expect("reopen")
        .extract_text()
        .expect("text")
        .join("\n");
    assert_eq!(text, "Meet [NAME]");
}

#[tokio::test]
async fn retry_maps_service_failure() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let input = render_text_pdf("anything", &TextLayout::default()).expect("input");
    let err = run_ai_retry_redaction(&client(&server), &input)
        .await
        .unwrap_err();
    assert!(matches!(err, RedactError::ExternalService(_)));
}
