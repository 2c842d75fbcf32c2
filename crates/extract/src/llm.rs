use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Anything that turns a prompt into a single free-text completion
pub trait LanguageModel: Send + Sync {
    /// Short provider/model name, used in logs and cache keys
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Plain functions work as models, which keeps tests off the network
impl<F> LanguageModel for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        "function"
    }

    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        std::future::ready(self(prompt))
    }
}

#[derive(Clone)]
pub struct CohereClient {
    base_url: String,
    api_key: String,
    model: Option<String>,
    preamble: String,
    temperature: f32,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CohereChatRequest<'a> {
    message: &'a str,
    preamble: &'a str,
    stream: bool,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct CohereStreamEvent {
    event_type: String,
    #[serde(default)]
    text: String,
}

impl CohereClient {
    pub fn new(base_url: String, api_key: String, model: Option<String>) -> Self {
        Self {
            base_url,
            api_key,
            model,
            preamble: String::new(),
            temperature: 0.0,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn chat(&self, message: &str) -> Result<String> {
        let url = format!("{}/v1/chat", self.base_url.trim_end_matches('/'));

        let request = CohereChatRequest {
            message,
            preamble: &self.preamble,
            stream: true,
            temperature: self.temperature,
            model: self.model.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Cohere")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cohere request failed: {} {}", status, body.trim());
        }

        let body = response
            .text()
            .await
            .context("Failed to read Cohere response stream")?;

        let text = decode_chat_stream(&body);
        debug!(chars = text.len(), "Cohere stream decoded");
        Ok(text)
    }
}

/// Concatenate the `text-generation` events of a newline-delimited JSON
/// stream, stopping at `stream-end`. Lines that are not JSON are skipped.
pub fn decode_chat_stream(body: &str) -> String {
    let mut text = String::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(event) = serde_json::from_str::<CohereStreamEvent>(line) else {
            continue;
        };

        match event.event_type.as_str() {
            "text-generation" => text.push_str(&event.text),
            "stream-end" => break,
            _ => {}
        }
    }

    text
}

impl LanguageModel for CohereClient {
    fn name(&self) -> &str {
        self.model.as_deref().unwrap_or("cohere")
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat(prompt).await
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self.client
            .post(&url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }
}

impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }
}

#[derive(Clone)]
pub enum LlmClient {
    Cohere(CohereClient),
    Ollama(OllamaClient),
}

impl LanguageModel for LlmClient {
    fn name(&self) -> &str {
        match self {
            Self::Cohere(client) => client.name(),
            Self::Ollama(client) => client.name(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            Self::Cohere(client) => client.complete(prompt).await,
            Self::Ollama(client) => client.complete(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stream_concatenates_text_generation() {
        let body = concat!(
            "{\"is_finished\":false,\"event_type\":\"stream-start\",\"generation_id\":\"abc\"}\n",
            "{\"is_finished\":false,\"event_type\":\"text-generation\",\"text\":\"Entities:\\n\"}\n",
            "{\"is_finished\":false,\"event_type\":\"text-generation\",\"text\":\"[\\\"Hamlet\\\"]\"}\n",
            "{\"is_finished\":true,\"event_type\":\"stream-end\",\"finish_reason\":\"COMPLETE\"}\n",
        );

        assert_eq!(decode_chat_stream(body), "Entities:\n[\"Hamlet\"]");
    }

    #[test]
    fn test_decode_stream_stops_at_stream_end() {
        let body = concat!(
            "{\"event_type\":\"text-generation\",\"text\":\"kept\"}\n",
            "{\"event_type\":\"stream-end\"}\n",
            "{\"event_type\":\"text-generation\",\"text\":\" dropped\"}\n",
        );

        assert_eq!(decode_chat_stream(body), "kept");
    }

    #[test]
    fn test_decode_stream_skips_garbage_lines() {
        let body = "\n\nnot json\n{\"event_type\":\"text-generation\",\"text\":\"ok\"}\n{\"no_event\":1}\n";
        assert_eq!(decode_chat_stream(body), "ok");
    }

    #[test]
    fn test_cohere_request_omits_missing_model() {
        let request = CohereChatRequest {
            message: "hi",
            preamble: "",
            stream: true,
            temperature: 0.0,
            model: None,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["stream"], true);
        assert_eq!(json["message"], "hi");
        assert!(json.get("model").is_none());
    }

    #[tokio::test]
    async fn test_function_model() {
        let model = |prompt: &str| -> Result<String> { Ok(format!("echo: {}", prompt)) };

        assert_eq!(model.name(), "function");
        assert_eq!(model.complete("hello").await.unwrap(), "echo: hello");
    }

    #[test]
    fn test_provider_names() {
        let cohere = LlmClient::Cohere(CohereClient::new(
            "https://api.cohere.ai".to_string(),
            "key".to_string(),
            None,
        ));
        let ollama = LlmClient::Ollama(OllamaClient::default());

        assert_eq!(cohere.name(), "cohere");
        assert_eq!(ollama.name(), "llama3");
    }
}
