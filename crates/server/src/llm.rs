use std::fmt;
use std::future::Future;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A full request to the text-generation capability.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug)]
pub enum ProviderError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    EmptyResponse,
    /// Provider was never configured (no API key).
    Unconfigured,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Http(err) => write!(f, "LLM request failed: {err}"),
            ProviderError::Status { status, body } => {
                write!(f, "LLM API returned {status}: {body}")
            }
            ProviderError::EmptyResponse => f.write_str("LLM returned no text content"),
            ProviderError::Unconfigured => f.write_str("ANTHROPIC_API_KEY is not set"),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err)
    }
}

/// `generate(prompt) -> text`. One request, no retries.
pub trait TextGenerator: Send + Sync {
    fn complete(
        &self,
        prompt: &Prompt,
        model: &str,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Anthropic Messages API client.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1/messages") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/messages", base)
        } else {
            format!("{}/v1/messages", base)
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl TextGenerator for LlmClient {
    async fn complete(
        &self,
        prompt: &Prompt,
        model: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Unconfigured)?;

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": prompt.messages,
        });
        if let Some(system) = &prompt.system {
            body["system"] = serde_json::json!([
                { "type": "text", "text": system, "cache_control": { "type": "ephemeral" } }
            ]);
        }

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status, "LLM API error: {body}");
            return Err(ProviderError::Status { status, body });
        }

        let parsed: MessagesResponse = resp.json().await?;
        let text = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        tracing::debug!(model, chars = text.len(), "LLM completion received");
        Ok(text)
    }
}
