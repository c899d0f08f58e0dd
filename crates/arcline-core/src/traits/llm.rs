//! C10 External LLM Client port (spec §4.10, §6).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One turn of a multi-turn conversation (spec §4.10 `chat_completion`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

impl CompletionOptions {
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Discriminated result for JSON extraction, replacing exception-for-
/// control-flow on LLM JSON parsing (Design Notes item). Retries only
/// happen on `ParseError`, with a hard cap enforced by the caller.
#[derive(Debug, Clone)]
pub enum JsonCompletion {
    Ok(serde_json::Value),
    ParseError(String),
    SchemaError(String),
}

impl JsonCompletion {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, JsonCompletion::Ok(_))
    }

    #[must_use]
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            JsonCompletion::Ok(v) => Some(v),
            _ => None,
        }
    }
}

/// Port for chat-completion calls to an LLM service (spec §4.10, §6).
///
/// Every output an implementation returns must already have passed the
/// post-edit hallucination-fix pass (stale-role regex substitutions) —
/// that is part of this contract, not an optional implementation detail
/// (spec §4.10).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-turn completion, returning raw text.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        opts: CompletionOptions,
    ) -> Result<String>;

    /// Single-turn completion with tolerant JSON extraction: appends a
    /// JSON-format instruction if the user prompt doesn't already ask for
    /// one, and on parse failure scans the raw text for the first
    /// balanced `{...}` or `[...]` block before giving up.
    async fn complete_json(
        &self,
        system: &str,
        user: &str,
        opts: CompletionOptions,
    ) -> Result<JsonCompletion>;

    /// Multi-turn form.
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        opts: CompletionOptions,
    ) -> Result<String>;
}
