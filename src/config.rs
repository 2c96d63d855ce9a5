use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;

const DEFAULT_CONFIG_FILE: &str = "planner";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub ingest: IngestConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    /// Request body cap for multipart uploads, in megabytes.
    pub max_upload_mb: usize,
    /// Sessions idle longer than this are dropped.
    pub session_ttl_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8501,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["http://localhost:8501".to_string()],
            max_upload_mb: 200,
            session_ttl_minutes: 60,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Seeds the credential of CLI runs and new sessions. Never persisted.
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub allowed_models: Vec<String>,
    pub temperature: f32,
    /// Disables TLS certificate verification for the provider. Opt-in only.
    pub accept_invalid_certs: bool,
    pub request_timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4o".to_string(),
            allowed_models: vec!["gpt-4o".to_string(), "gpt-4".to_string()],
            temperature: 0.2,
            accept_invalid_certs: false,
            request_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LLMConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("allowed_models", &self.allowed_models)
            .field("temperature", &self.temperature)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl LLMConfig {
    pub fn is_allowed_model(&self, model: &str) -> bool {
        self.allowed_models.iter().any(|m| m == model)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows kept in tabular previews. The prompt always receives the full table.
    pub preview_rows: usize,
    pub pdf_enabled: bool,
    pub ocr_enabled: bool,
    pub tesseract_path: String,
    pub ocr_language: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            preview_rows: 50,
            pdf_enabled: true,
            ocr_enabled: true,
            tesseract_path: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Migration Plan".to_string(),
        }
    }
}

impl Config {
    /// Layered load: defaults, then `planner.toml` (or `$PLANNER_CONFIG`), then
    /// `PLANNER_*` environment variables such as `PLANNER_SERVER__PORT`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = env::var("PLANNER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("PLANNER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("llm.allowed_models")
                    .with_list_parse_key("server.cors_allowed_origins")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", file))?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.llm.api_key.is_none() {
            config.llm.api_key = env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        if !config.llm.is_allowed_model(&config.llm.default_model) {
            anyhow::bail!(
                "Default model {} is not in the allowed model list {:?}",
                config.llm.default_model,
                config.llm.allowed_models
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_planner_options() {
        let config = Config::default();
        assert_eq!(config.llm.default_model, "gpt-4o");
        assert!(config.llm.is_allowed_model("gpt-4"));
        assert!(!config.llm.is_allowed_model("gpt-3.5-turbo"));
        assert!(!config.llm.accept_invalid_certs);
        assert_eq!(config.export.title, "Migration Plan");
        assert_eq!(config.server.session_ttl_minutes, 60);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = LLMConfig::default();
        config.api_key = Some("sk-secret-123".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret-123"));
        assert!(rendered.contains("<redacted>"));
    }
}
