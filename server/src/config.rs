use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use scrub_llm::ChatClient;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    // ============ Listener ============
    pub host: String,
    pub port: u16,
    /// Request body cap in MiB
    pub max_body_mb: usize,
    /// `["*"]` allows any origin
    pub allowed_origins: Vec<String>,

    // ============ Models ============
    /// Lexicon file; the embedded English model when unset
    pub ner_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_mb: 50,
            allowed_origins: vec!["*".to_string()],
            ner_model: None,
            openai_api_key: None,
            openai_base_url: None,
            openai_model: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl AppConfig {
    /// Loads `SCRUB_CONFIG` (if set) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("SCRUB_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overrides fields from `lookup`; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("SCRUB_HOST") {
            self.host = host;
        }
        if let Some(port) = get("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(mb) = get("SCRUB_MAX_BODY_MB") {
            self.max_body_mb = mb.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "SCRUB_MAX_BODY_MB",
                value: mb.clone(),
            })?;
        }
        if let Some(origins) = get("SCRUB_ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(model) = get("SCRUB_NER_MODEL") {
            self.ner_model = Some(model);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai_base_url = Some(url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.openai_model = Some(model);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            key: "SCRUB_HOST",
            value: raw,
        })
    }

    pub fn any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Chat client for the AI retry path, if a key is configured.
    pub fn chat_client(&self) -> Option<ChatClient> {
        let key = self.openai_api_key.as_ref()?;
        let mut client = ChatClient::new(key.clone());
        if let Some(url) = &self.openai_base_url {
            client = client.with_base_url(url.clone());
        }
        if let Some(model) = &self.openai_model {
            client = client.with_model(model.clone());
        }
        Some(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_allow_any_origin_without_ai() {
        let config = AppConfig::default();
        assert!(config.any_origin());
        assert!(config.chat_client().is_none());
        assert_eq!(config.socket_addr().expect("addr").port(), 8000);
    }

    #[test]
    fn env_overrides_fields() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "9100"),
                ("SCRUB_ALLOWED_ORIGINS", "https://a.test, https://b.test"),
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-4o"),
                ("SCRUB_NER_MODEL", ""),
            ]))
            .expect("apply");
        assert_eq!(config.port, 9100);
        assert_eq!(config.allowed_origins, vec!["https://a.test", "https://b.test"]);
        assert!(!config.any_origin());
        assert!(config.ner_model.is_none());
        let client = config.chat_client().expect("client");
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scrub.json");
        fs::write(&path, r#"{"port": 7000, "nerModel": "/opt/lexicon.json"}"#).expect("write");
        let config = AppConfig::from_file(&path).expect("load");
        assert_eq!(config.port, 7000);
        assert_eq!(config.ner_model.as_deref(), Some("/opt/lexicon.json"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_body_mb, 50);
    }
}
