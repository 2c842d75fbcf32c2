use anyhow::{Context, Result};
use extract::{CohereClient, LlmClient, OllamaClient, DEFAULT_CONTEXT};
use graph::RenderOptions;
use ingest::PageRange;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub request: RequestDefaults,
    pub render: RenderOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Cohere,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Empty means the provider's public endpoint
    pub base_url: String,
    /// Empty means the provider's default model
    pub model: String,
    pub temperature: f32,
    pub preamble: String,
    pub request_timeout_secs: u64,
    /// Read from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

/// Used when a request leaves these out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub context: String,
    pub pages_from: usize,
    pub pages_to: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Cohere,
            base_url: String::new(),
            model: String::new(),
            temperature: 0.0,
            preamble: String::new(),
            request_timeout_secs: 120,
            api_key: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        let pages = PageRange::default();
        Self {
            context: DEFAULT_CONTEXT.to_string(),
            pages_from: pages.from,
            pages_to: pages.to,
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> String {
        if !self.base_url.is_empty() {
            return self.base_url.clone();
        }
        match self.provider {
            LlmProvider::Cohere => "https://api.cohere.ai".to_string(),
            LlmProvider::Ollama => "http://localhost:11434".to_string(),
        }
    }
}

impl RequestDefaults {
    pub fn page_range(&self) -> PageRange {
        PageRange::new(self.pages_from, self.pages_to)
    }
}

impl AppConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config file {:?}", path))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse TOML config")
    }

    /// Apply overrides from `lookup`, which returns the value of an
    /// environment variable if set. An unknown provider name is an error.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("KGRAPHER_BIND") {
            self.server.bind = bind;
        }
        if let Some(provider) = lookup("KGRAPHER_LLM_PROVIDER") {
            self.llm.provider = match provider.trim().to_ascii_lowercase().as_str() {
                "cohere" => LlmProvider::Cohere,
                "ollama" => LlmProvider::Ollama,
                _ => anyhow::bail!(
                    "KGRAPHER_LLM_PROVIDER must be \"cohere\" or \"ollama\", got {:?}",
                    provider
                ),
            };
        }
        if let Some(model) = lookup("KGRAPHER_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = lookup("KGRAPHER_LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(key) = lookup("COHERE_API_KEY") {
            self.llm.api_key = Some(key);
        }
        Ok(())
    }

    /// Build the configured language model client
    pub fn llm_client(&self) -> Result<LlmClient> {
        let timeout = Duration::from_secs(self.llm.request_timeout_secs);
        let model = (!self.llm.model.is_empty()).then(|| self.llm.model.clone());

        match self.llm.provider {
            LlmProvider::Cohere => {
                let api_key = self
                    .llm
                    .api_key
                    .clone()
                    .context("COHERE_API_KEY is not set")?;

                Ok(LlmClient::Cohere(
                    CohereClient::new(self.llm.base_url(), api_key, model)
                        .with_preamble(self.llm.preamble.clone())
                        .with_temperature(self.llm.temperature)
                        .with_timeout(timeout),
                ))
            }
            LlmProvider::Ollama => {
                let model = model.unwrap_or_else(|| "llama3".to_string());
                Ok(LlmClient::Ollama(
                    OllamaClient::new(self.llm.base_url(), model).with_timeout(timeout),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::LanguageModel;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.llm.provider, LlmProvider::Cohere);
        assert_eq!(config.request.context, "lawyer");
        assert_eq!(config.request.page_range(), PageRange::new(0, 5));
        assert_eq!(config.render.height, "600px");
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [llm]
            provider = "ollama"
            base_url = "http://localhost:11434"
            model = "mistral"

            [request]
            pages_to = 12

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.request_timeout_secs, 120);
        assert_eq!(config.request.page_range(), PageRange::new(0, 12));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.bind, "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(AppConfig::from_toml("[llm]\nprovider = \"openai\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("KGRAPHER_BIND", "127.0.0.1:8080"),
            ("KGRAPHER_LLM_PROVIDER", "Ollama"),
            ("COHERE_API_KEY", "secret"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_unknown_provider_override_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|key| (key == "KGRAPHER_LLM_PROVIDER").then(|| "openai".to_string()))
            .unwrap_err();

        assert!(err.to_string().contains("openai"));
        assert_eq!(config.llm.provider, LlmProvider::Cohere);
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("secret".to_string());

        let raw = toml::to_string(&config).unwrap();
        assert!(!raw.contains("secret"));
    }

    #[test]
    fn test_base_url_follows_provider() {
        let mut config = AppConfig::default();
        assert_eq!(config.llm.base_url(), "https://api.cohere.ai");

        config.llm.provider = LlmProvider::Ollama;
        assert_eq!(config.llm.base_url(), "http://localhost:11434");

        config.llm.base_url = "http://gpu-box:11434".to_string();
        assert_eq!(config.llm.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_cohere_requires_api_key() {
        let config = AppConfig::default();
        assert!(config.llm_client().is_err());
    }

    #[test]
    fn test_ollama_client_uses_configured_model() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Ollama;
        config.llm.model = "mistral".to_string();

        let client = config.llm_client().unwrap();
        assert_eq!(client.name(), "mistral");
    }
}
