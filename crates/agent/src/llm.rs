use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use packslip_core::config::{require_llm_credentials, LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Text-generation client speaking the provider's native HTTP API.
#[derive(Clone, Debug)]
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        require_llm_credentials(config)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn api_key(&self) -> &str {
        self.api_key.as_ref().map(|key| key.expose_secret()).unwrap_or_default()
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        match self.provider {
            LlmProvider::Gemini => self
                .client
                .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
                .header("x-goog-api-key", self.api_key())
                .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] })),
            LlmProvider::OpenAi => self
                .client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(self.api_key())
                .json(&json!({
                    "model": self.model,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            LlmProvider::Anthropic => self
                .client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", self.api_key())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "messages": [{ "role": "user", "content": prompt }],
                })),
            LlmProvider::Ollama => self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&json!({ "model": self.model, "prompt": prompt, "stream": false })),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .request(prompt)
            .send()
            .await
            .with_context(|| format!("{:?} request failed", self.provider))?
            .error_for_status()
            .with_context(|| format!("{:?} returned an error status", self.provider))?;

        let body: Value = response.json().await.context("provider reply was not valid json")?;
        Ok(extract_text(self.provider, &body))
    }
}

/// Pulls the generated text out of a provider reply; missing text is an empty string.
pub fn extract_text(provider: LlmProvider, body: &Value) -> String {
    match provider {
        LlmProvider::Gemini => body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| join_text(parts.iter().filter_map(|part| part.get("text"))))
            .unwrap_or_default(),
        LlmProvider::OpenAi => body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        LlmProvider::Anthropic => body
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                join_text(
                    blocks
                        .iter()
                        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                        .filter_map(|block| block.get("text")),
                )
            })
            .unwrap_or_default(),
        LlmProvider::Ollama => {
            body.get("response").and_then(Value::as_str).unwrap_or_default().to_string()
        }
    }
}

fn join_text<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.filter_map(Value::as_str).collect()
}

#[cfg(test)]
mod tests {
    use packslip_core::config::{LlmConfig, LlmProvider};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{extract_text, HttpLlmClient, LlmClient};

    fn config(provider: LlmProvider, base_url: String) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some("test-key".to_string().into()),
            base_url: Some(base_url),
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn extracts_text_for_each_provider_shape() {
        let gemini = json!({ "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] } }] });
        let openai = json!({ "choices": [{ "message": { "content": "Hi" } }] });
        let anthropic = json!({ "content": [{ "type": "text", "text": "Dear" }, { "type": "tool_use" }] });
        let ollama = json!({ "response": "Yo" });

        assert_eq!(extract_text(LlmProvider::Gemini, &gemini), "Hello there");
        assert_eq!(extract_text(LlmProvider::OpenAi, &openai), "Hi");
        assert_eq!(extract_text(LlmProvider::Anthropic, &anthropic), "Dear");
        assert_eq!(extract_text(LlmProvider::Ollama, &ollama), "Yo");
    }

    #[test]
    fn missing_text_becomes_empty_string() {
        assert_eq!(extract_text(LlmProvider::Gemini, &json!({ "candidates": [] })), "");
        assert_eq!(extract_text(LlmProvider::OpenAi, &json!({})), "");
    }

    #[test]
    fn hosted_provider_without_key_cannot_be_built() {
        let mut config = config(LlmProvider::Gemini, "http://localhost:1".to_string());
        config.api_key = None;

        assert!(HttpLlmClient::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn gemini_request_carries_key_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({ "contents": [{ "parts": [{ "text": "prompt" }] }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "drafted" }] } }]
            })))
            .mount(&server)
            .await;

        let client = HttpLlmClient::from_config(&config(LlmProvider::Gemini, server.uri()))
            .expect("client builds");
        let reply = client.complete("prompt").await.expect("completion succeeds");

        assert_eq!(reply, "drafted");
    }

    #[tokio::test]
    async fn openai_request_uses_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "hello" } }]
            })))
            .mount(&server)
            .await;

        let client = HttpLlmClient::from_config(&config(LlmProvider::OpenAi, server.uri()))
            .expect("client builds");

        assert_eq!(client.complete("prompt").await.expect("completion succeeds"), "hello");
    }

    #[tokio::test]
    async fn ollama_runs_without_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "model": "test-model", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "local" })))
            .mount(&server)
            .await;

        let mut config = config(LlmProvider::Ollama, server.uri());
        config.api_key = None;
        let client = HttpLlmClient::from_config(&config).expect("client builds");

        assert_eq!(client.complete("prompt").await.expect("completion succeeds"), "local");
    }

    #[tokio::test]
    async fn error_status_is_reported_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = HttpLlmClient::from_config(&config(LlmProvider::Anthropic, server.uri()))
            .expect("client builds");

        assert!(client.complete("prompt").await.is_err());
    }
}
