//! Environment variable names and explicit, warn-on-parse-failure reads
//! (spec §6: "No secret ever appears in logs"; SPEC_FULL §2 Design Notes
//! kwarg-soup item: "environment-variable overrides read explicitly, no
//! silent fallback"). Grounded in
//! `dashflow-observability`'s websocket server config module.

pub const DATABASE_URL: &str = "ARCLINE_DATABASE_URL";
pub const NEO4J_URI: &str = "ARCLINE_NEO4J_URI";
pub const NEO4J_USER: &str = "ARCLINE_NEO4J_USER";
pub const NEO4J_PASSWORD: &str = "ARCLINE_NEO4J_PASSWORD";
pub const LLM_API_KEY: &str = "ARCLINE_LLM_API_KEY";
pub const LLM_MODEL: &str = "ARCLINE_LLM_MODEL";
pub const LLM_API_URL: &str = "ARCLINE_LLM_API_URL";
pub const CONFIG_PATH: &str = "ARCLINE_CONFIG_PATH";
pub const CHECKPOINT_DIR: &str = "ARCLINE_CHECKPOINT_DIR";

const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_CHECKPOINT_DIR: &str = "logs/checkpoints";

/// Read a required variable, surfacing a [`PipelineError::FatalConfig`]-
/// shaped message (spec §7 "missing API key... process exits 1 before any
/// work") rather than panicking.
pub fn require(var_name: &str) -> anyhow::Result<String> {
    std::env::var(var_name)
        .map_err(|_| anyhow::anyhow!("missing required environment variable {var_name}"))
}

#[must_use]
pub fn llm_model() -> String {
    std::env::var(LLM_MODEL).unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string())
}

#[must_use]
pub fn llm_api_url() -> Option<String> {
    std::env::var(LLM_API_URL).ok()
}

#[must_use]
pub fn checkpoint_dir() -> String {
    std::env::var(CHECKPOINT_DIR).unwrap_or_else(|_| DEFAULT_CHECKPOINT_DIR.to_string())
}

#[must_use]
pub fn config_path() -> Option<String> {
    std::env::var(CONFIG_PATH).ok()
}
