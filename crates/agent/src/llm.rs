use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use upkeep_core::config::{LlmConfig, LlmProvider};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to build llm http client")?;

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("llm.base_url is required for the ollama provider"))?;
            Arc::new(OllamaClient::new(http, base_url, config.model.clone()))
        }
        LlmProvider::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("llm.api_key is required for the openai provider"))?;
            let base_url =
                config.base_url.clone().unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_owned());
            Arc::new(OpenAiClient::new(http, base_url, api_key, config.model.clone()))
        }
    };
    Ok(client)
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn chat_messages<'a>(system_prompt: &'a str, user_prompt: &'a str) -> [ChatMessage<'a>; 2] {
    [
        ChatMessage { role: "system", content: system_prompt },
        ChatMessage { role: "user", content: user_prompt },
    ]
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

/// Local models served by Ollama's chat API.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(http: reqwest::Client, base_url: String, model: String) -> Self {
        Self { http, base_url, model }
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: chat_messages(system_prompt, user_prompt),
            stream: false,
            format: "json",
        };
        let response = self
            .http
            .post(endpoint(&self.base_url, "/api/chat"))
            .json(&body)
            .send()
            .await
            .context("ollama request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ollama returned HTTP {status}"));
        }
        let parsed: OllamaChatResponse =
            response.json().await.context("ollama response was not valid JSON")?;
        Ok(parsed.message.content)
    }
}

/// OpenAI-compatible chat completions.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: SecretString,
        model: String,
    ) -> Self {
        Self { http, base_url, api_key, model }
    }
}

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = OpenAiChatRequest {
            model: &self.model,
            messages: chat_messages(system_prompt, user_prompt),
            response_format: ResponseFormat { kind: "json_object" },
        };
        let response = self
            .http
            .post(endpoint(&self.base_url, "/v1/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("openai request failed")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("openai returned HTTP {status}"));
        }
        let parsed: OpenAiChatResponse =
            response.json().await.context("openai response was not valid JSON")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("openai response had no message content"))
    }
}
