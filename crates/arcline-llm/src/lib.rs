//! Anthropic-backed [`LlmClient`] (spec §4.10, §6). Grounded in
//! `dashflow-anthropic::ChatAnthropic`'s Messages API request/response
//! shapes and HTTP error classification, trimmed to this pipeline's
//! single-turn/multi-turn/JSON-extraction contract — no tool use,
//! streaming, or thinking blocks, none of which this pipeline needs.

pub mod error;
mod hallucination;
mod json_extract;

pub use error::LlmError;

use arcline_core::error::Result;
use arcline_core::traits::{ChatMessage, CompletionOptions, JsonCompletion, LlmClient, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic Claude chat client implementing [`LlmClient`].
pub struct AnthropicClient {
    api_key: String,
    model: String,
    api_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl AnthropicClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_url: DEFAULT_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let parsed = serde_json::from_str::<AnthropicErrorEnvelope>(body).ok();
        let (error_type, message) = parsed
            .as_ref()
            .map(|e| (e.error.error_type.as_str(), e.error.message.as_str()))
            .unwrap_or(("unknown_error", body));

        match (status, error_type) {
            (reqwest::StatusCode::TOO_MANY_REQUESTS, _) | (_, "rate_limit_error") => {
                LlmError::RateLimited(message.to_string())
            }
            (reqwest::StatusCode::UNAUTHORIZED, _)
            | (reqwest::StatusCode::FORBIDDEN, _)
            | (_, "authentication_error")
            | (_, "permission_error") => LlmError::Authentication(message.to_string()),
            _ if status.is_server_error() => LlmError::RateLimited(message.to_string()),
            _ => LlmError::Api(format!("Anthropic API error ({status}): {message}")),
        }
    }

    async fn request(
        &self,
        system: Option<&str>,
        messages: Vec<AnthropicMessage>,
        opts: CompletionOptions,
    ) -> Result<String> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: opts.max_tokens,
            messages,
            system,
            temperature: opts.temperature,
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Self::map_http_error(status, &body).into());
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("failed to parse response: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(hallucination::fix(&text))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str, opts: CompletionOptions) -> Result<String> {
        self.request(
            Some(system),
            vec![AnthropicMessage {
                role: "user",
                content: user.to_string(),
            }],
            opts,
        )
        .await
    }

    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        opts: CompletionOptions,
    ) -> Result<JsonCompletion> {
        let user_prompt = if json_extract::already_asks_for_json(user) {
            user.to_string()
        } else {
            format!("{user}\n\nRespond with JSON only, no prose.")
        };

        let text = self.complete(system, &user_prompt, opts).await?;

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => Ok(JsonCompletion::Ok(value)),
            Err(_) => match json_extract::extract_first_json_block(&text) {
                Some(value) => Ok(JsonCompletion::Ok(value)),
                None => {
                    warn!(%text, "LLM response contained no JSON block");
                    Ok(JsonCompletion::ParseError(text))
                }
            },
        }
    }

    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        opts: CompletionOptions,
    ) -> Result<String> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());

        let turns = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => unreachable!("system messages filtered above"),
                },
                content: m.content.clone(),
            })
            .collect();

        self.request(system, turns, opts).await
    }
}
