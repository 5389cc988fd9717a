use scrub_core::RedactError;
use scrub_pdf::PdfDocument;
use scrub_render::{render_text_pdf, TextLayout};

use crate::TextGenerator;

pub const SYSTEM_PROMPT: &str = "You are a PII removal agent.";
pub const AI_SUMMARY: &str = "AI redaction applied";

fn user_prompt(text: &str) -> String {
    format!("Redact all PII from this document:\n{text}")
}

/// Rebuilds `bytes` from the model's redacted rendition of its text.
///
/// The output is a new text-only document; original layout, images and
/// metadata are not carried over.
pub async fn run_ai_retry_redaction(
    generator: &dyn TextGenerator,
    bytes: &[u8],
) -> Result<(Vec<u8>, String), RedactError> {
    let text = PdfDocument::open(bytes)?.extract_text()?.join("\n");
    log::debug!("[AI] extracted {} chars for re-redaction", text.len());

    let reply = generator.generate(SYSTEM_PROMPT, &user_prompt(&text)).await?;

    let rendered = render_text_pdf(&reply, &TextLayout::default())
        .map_err(|e| RedactError::Serialization(e.to_string()))?;
    log::info!("[AI] re-redaction produced {} bytes", rendered.len());
    Ok((rendered, AI_SUMMARY.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LlmError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, system: &str, user: &str) -> Result<String> {
            self.seen
                .lock()
                .map_err(|e| LlmError::Config(e.to_string()))?
                .push((system.to_string(), user.to_string()));
            self.reply.clone().map_err(LlmError::Network)
        }
    }

    fn recording(reply: std::result::Result<&str, &str>) -> Recording {
        Recording {
            reply: reply.map(str::to_string).map_err(str::to_string),
            seen: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn sends_fixed_prompts_and_typesets_reply() {
        let input = render_text_pdf("Call Jane\nat home", &TextLayout::default()).expect("input");
        let generator = recording(Ok("Call [REDACTED]\nat home"));

        let (bytes, summary) = run_ai_retry_redaction(&generator, &input)
            .await
            .expect("retry");
        assert_eq!(summary, AI_SUMMARY);

        let seen = generator.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "You are a PII removal agent.");
        assert_eq!(
            seen[0].1,
            "Redact all PII from this document:\nCall Jane\nat home"
        );

        let pages = PdfDocument::open(&bytes)
            .expect("reopen")
            .extract_text()
            .expect("text");
        assert_eq!(pages, vec!["Call [REDACTED]\nat home".to_string()]);
    }

    #[tokio::test]
    async fn generator_failure_is_external_service_error() {
        let input = render_text_pdf("x", &TextLayout::default()).expect("input");
        let generator = recording(Err("connection refused"));
        let err = run_ai_retry_redaction(&generator, &input).await.unwrap_err();
        assert!(matches!(err, RedactError::ExternalService(m) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn unreadable_input_is_format_error() {
        let generator = recording(Ok("unused"));
        let err = run_ai_retry_redaction(&generator, b"not a pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, RedactError::DocumentFormat(_)));
        assert!(generator.seen.lock().expect("lock").is_empty());
    }
}
