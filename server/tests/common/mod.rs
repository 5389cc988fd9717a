#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use lopdf::{dictionary, Document, Object, Stream};
use scrub_llm::{LlmError, TextGenerator};
use scrub_server::{build_app, AppConfig, AppState};
use serde_json::Value;

/// One Helvetica text line per page.
pub fn pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut kids = Vec::new();
    for line in lines {
        let content = format!("BT /F1 12 Tf 72 720 Td ({line}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("build fixture");
    out
}

/// Replies with fixed text, or fails when `reply` is `None`.
pub struct CannedGenerator {
    pub reply: Option<String>,
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _system: &str, _user: &str) -> scrub_llm::Result<String> {
        self.reply
            .clone()
            .ok_or_else(|| LlmError::Network("upstream unreachable".into()))
    }
}

pub fn app_with(ai: Option<Arc<dyn TextGenerator>>) -> Router {
    let recognizer = scrub_ner::load_model(None).expect("embedded model");
    let state = AppState::new(Arc::new(recognizer), ai);
    build_app(state, &AppConfig::default())
}

pub fn app() -> Router {
    app_with(None)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}
