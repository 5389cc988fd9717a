use std::sync::Arc;

use anyhow::{Context, Result};
use scrub_llm::TextGenerator;
use scrub_server::{build_app, AppConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scrub_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let recognizer = scrub_ner::load_model(config.ner_model.as_deref())
        .context("failed to load NER model")?;
    tracing::info!(model = %scrub_ner::EntityRecognizer::name(&recognizer), "NER model loaded");

    let ai: Option<Arc<dyn TextGenerator>> = match config.chat_client() {
        Some(client) => {
            tracing::info!(model = %client.model(), "AI retry enabled");
            Some(Arc::new(client))
        }
        None => {
            tracing::info!("OPENAI_API_KEY not set, AI retry disabled");
            None
        }
    };

    let state = AppState::new(Arc::new(recognizer), ai);
    let app = build_app(state, &config);

    let addr = config.socket_addr().context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "scrub-server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
