//! # ai — remote model clients
//!
//! Supports Claude, OpenAI and a plain text-generation endpoint, selected by
//! `AI_PROVIDER`. Every call returns the raw generated text; parsing it is
//! the predictor's job.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AiConfig, AiProvider};

/// Anything that turns a prompt into generated text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// `false` means the predictor should not even try and go straight to
    /// the fallback.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// HTTP client for the configured provider.
pub struct AiClient {
    client: reqwest::Client,
    config: AiConfig,
}

impl AiClient {
    pub fn new(client: reqwest::Client, config: AiConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> anyhow::Result<&str> {
        self.config
            .api_key
            .as_deref()
            .context("AI_API_KEY is not set")
    }
}

#[async_trait]
impl ModelClient for AiClient {
    fn is_enabled(&self) -> bool {
        self.config.provider != AiProvider::Disabled
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        match self.config.provider {
            AiProvider::Claude => self.call_claude(prompt).await,
            AiProvider::OpenAi => self.call_openai(prompt).await,
            AiProvider::Endpoint => self.call_endpoint(prompt).await,
            AiProvider::Disabled => anyhow::bail!("AI provider disabled"),
        }
    }
}

// ─── Anthropic Claude ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model:      &'a str,
    max_tokens: u32,
    messages:   Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role:    &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    text: Option<String>,
}

impl AiClient {
    async fn call_claude(&self, prompt: &str) -> anyhow::Result<String> {
        let body = ClaudeRequest {
            model:      &self.config.model,
            max_tokens: 512,
            messages:   vec![ChatMessage { role: "user", content: prompt }],
        };

        debug!(model = %self.config.model, "Calling Claude API...");

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.api_key()?)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .timeout(self.config.timeout)
            .send()
            .await
            .context("Claude API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Claude API error {status}: {text}");
        }

        let data: ClaudeResponse = resp.json().await.context("Claude response parse error")?;

        data.content
            .into_iter()
            .find_map(|c| c.text)
            .context("Claude returned empty content")
    }
}

// ─── OpenAI ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model:       &'a str,
    temperature: f32,
    messages:    Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMsg,
}

#[derive(Deserialize)]
struct OpenAiChoiceMsg {
    content: Option<String>,
}

impl AiClient {
    async fn call_openai(&self, prompt: &str) -> anyhow::Result<String> {
        let body = OpenAiRequest {
            model:       &self.config.model,
            temperature: 0.1,
            messages: vec![
                ChatMessage { role: "system", content: "You are a stock market expert. Always respond with valid JSON only." },
                ChatMessage { role: "user",   content: prompt },
            ],
        };

        debug!(model = %self.config.model, "Calling OpenAI API...");

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(self.api_key()?)
            .json(&body)
            .timeout(self.config.timeout)
            .send()
            .await
            .context("OpenAI API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {status}: {text}");
        }

        let data: OpenAiResponse = resp.json().await.context("OpenAI response parse error")?;

        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("OpenAI returned empty content")
    }
}

// ─── Text-generation endpoint ─────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs:     &'a str,
    parameters: GenerateParameters,
}

#[derive(Serialize)]
struct GenerateParameters {
    max_new_tokens:   u32,
    temperature:      f32,
    return_full_text: bool,
}

/// Servers answer either `[{"generated_text": ..}]` or `{"generated_text": ..}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Batch(Vec<Generated>),
    Single(Generated),
}

#[derive(Deserialize)]
struct Generated {
    #[serde(default)]
    generated_text: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        match self {
            GenerateResponse::Batch(items) => items.into_iter().next().map(|g| g.generated_text),
            GenerateResponse::Single(g) => Some(g.generated_text),
        }
    }
}

impl AiClient {
    async fn call_endpoint(&self, prompt: &str) -> anyhow::Result<String> {
        let url = self
            .config
            .endpoint_url
            .as_deref()
            .context("AI_ENDPOINT_URL is not set")?;

        let body = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens:   150,
                temperature:      0.1,
                return_full_text: false,
            },
        };

        debug!(url, model = %self.config.model, "Calling inference endpoint...");

        let mut req = self.client.post(url).json(&body).timeout(self.config.timeout);
        if let Some(key) = self.config.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("Inference endpoint request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Inference endpoint error {status}: {text}");
        }

        let data: GenerateResponse = resp.json().await.context("Inference endpoint response parse error")?;

        data.into_text()
            .filter(|t| !t.trim().is_empty())
            .context("Inference endpoint returned empty text")
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_response_shapes() {
        let batch: GenerateResponse =
            serde_json::from_str(r#"[{"generated_text":"a"},{"generated_text":"b"}]"#).unwrap();
        assert_eq!(batch.into_text().as_deref(), Some("a"));

        let single: GenerateResponse = serde_json::from_str(r#"{"generated_text":"x"}"#).unwrap();
        assert_eq!(single.into_text().as_deref(), Some("x"));

        let empty: GenerateResponse = serde_json::from_str("[]").unwrap();
        assert_eq!(empty.into_text(), None);
    }

    #[test]
    fn test_generate_request_payload() {
        let body = GenerateRequest {
            inputs: "hi",
            parameters: GenerateParameters { max_new_tokens: 150, temperature: 0.1, return_full_text: false },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["inputs"], "hi");
        assert_eq!(json["parameters"]["max_new_tokens"], 150);
        assert_eq!(json["parameters"]["return_full_text"], false);
    }

    #[tokio::test]
    async fn test_disabled_client() {
        let client = AiClient::new(reqwest::Client::new(), AiConfig::default());
        assert!(!client.is_enabled());
        assert!(client.complete("x").await.is_err());
    }
}
