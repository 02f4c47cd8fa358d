//! HTTP client for an OpenAI-compatible chat-completions provider.
//!
//! One prompt in, one message out. The JSON-shaped stages go through
//! [`LlmClient::complete_json`], which cleans the payload before parsing —
//! models occasionally wrap JSON in markdown fences or prose despite being
//! told not to. No retry or backoff: a failed call is the caller's problem.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("could not parse model output as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("provider returned no completion choices")]
    EmptyResponse,

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

/// Connection and sampling settings for the completion provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API, e.g.
    /// `https://api.groq.com/openai/v1` (no trailing slash needed).
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";
    pub const DEFAULT_MODEL: &'static str = "mixtral-8x7b-32768";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            timeout_secs: 60,
        }
    }

    /// Read configuration from `CLAUSEGUARD_LLM_KEY` (required),
    /// `CLAUSEGUARD_LLM_URL`, and `CLAUSEGUARD_LLM_MODEL`.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("CLAUSEGUARD_LLM_KEY")
            .map_err(|_| LlmError::MissingConfig("CLAUSEGUARD_LLM_KEY"))?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("CLAUSEGUARD_LLM_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("CLAUSEGUARD_LLM_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat-completion client.
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: LlmConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one prompt and return the raw completion text.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        info!(model = %self.config.model, prompt_chars = prompt.len(), "calling completion API");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message
            .content;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    /// Send one prompt, clean the response, and parse it as `T`.
    pub async fn complete_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, LlmError> {
        let raw = self.complete(prompt).await?;
        let cleaned = clean_json_payload(&raw);
        Ok(serde_json::from_str(&cleaned)?)
    }
}

/// Strip markdown code fences and surrounding prose from a model response,
/// leaving the outermost JSON object.
pub fn clean_json_payload(raw: &str) -> String {
    static FENCE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("invalid fence regex")
    });

    let unfenced = match FENCE.captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw,
    };

    // Trim any leading/trailing prose around the outermost object.
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => unfenced[start..=end].to_string(),
        _ => unfenced.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_passes_bare_json_through() {
        let raw = r#"{"clauses": []}"#;
        assert_eq!(clean_json_payload(raw), raw);
    }

    #[test]
    fn clean_strips_json_fences() {
        let raw = "```json\n{\"clauses\": []}\n```";
        assert_eq!(clean_json_payload(raw), r#"{"clauses": []}"#);
    }

    #[test]
    fn clean_strips_anonymous_fences() {
        let raw = "```\n{\"total\": 3}\n```";
        assert_eq!(clean_json_payload(raw), r#"{"total": 3}"#);
    }

    #[test]
    fn clean_drops_surrounding_prose() {
        let raw = "Here is the analysis you asked for:\n{\"risks\": []}\nLet me know if you need more.";
        assert_eq!(clean_json_payload(raw), r#"{"risks": []}"#);
    }

    #[test]
    fn clean_keeps_nested_braces_intact() {
        let raw = "prefix {\"a\": {\"b\": 1}} suffix";
        assert_eq!(clean_json_payload(raw), r#"{"a": {"b": 1}}"#);
    }

    #[test]
    fn cleaned_payload_parses_into_schemas() {
        let raw = "```json\n{\"clauses\": [{\"id\": 1, \"type\": \"Payment Terms\", \"text\": \"t\"}]}\n```";
        let parsed: clauseguard_core::analysis::ClausesOutput =
            serde_json::from_str(&clean_json_payload(raw)).unwrap();
        assert_eq!(parsed.clauses.len(), 1);
    }

    #[test]
    fn config_defaults_match_provider_limits() {
        let config = LlmConfig::new("key");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let mut config = LlmConfig::new("key");
        config.base_url = "https://api.groq.com/openai/v1/".to_string();
        let client = LlmClient::new(config).unwrap();
        assert_eq!(client.config.base_url, "https://api.groq.com/openai/v1");
    }
}
