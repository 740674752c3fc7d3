//! Language-model backend used by the intent classifier.
//!
//! One capability: `complete(system, user) -> text`. The default
//! implementation speaks the OpenAI-compatible chat-completions wire format,
//! which also covers DeepSeek, Ollama's OpenAI endpoint, and similar
//! providers. Retries and rate limiting are left to the provider layer;
//! the classifier treats every failure the same way.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Text-completion capability consumed by the classifier.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    api_url: String,
    model: String,
    provider: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            provider: provider_label(&config.api_url),
            timeout: config.timeout,
        }
    }
}

/// Short provider name for error messages, taken from the endpoint host.
fn provider_label(api_url: &str) -> String {
    api_url
        .strip_prefix("https://")
        .or_else(|| api_url.strip_prefix("http://"))
        .unwrap_or(api_url)
        .split('/')
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or("llm")
        .to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{head}...")
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        // The classifier is the only consumer, so JSON mode and a low
        // temperature are hardwired here.
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.3,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        provider: self.provider.clone(),
                        timeout: self.timeout,
                    }
                } else {
                    LlmError::RequestFailed {
                        provider: self.provider.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::BadStatus {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let completion: ChatResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: self.provider.clone(),
                reason: e.to_string(),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.provider.clone(),
                reason: "no completion in response".to_string(),
            })
    }
}
