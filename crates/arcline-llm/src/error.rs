//! Anthropic-specific error type, converted into [`arcline_core::PipelineError`]
//! at the port boundary (teacher pattern: `dashflow-anthropic::ChatAnthropic::map_http_error`
//! classifying HTTP/API error shapes onto a core error enum).

use arcline_core::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request error: {0}")]
    Request(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("api error: {0}")]
    Api(String),
}

/// Rate limits and transient API/network failures are retryable
/// (spec §4.10, §7); authentication and other API errors are not —
/// retrying a bad key just burns the runner's budget.
impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited(_) | LlmError::Request(_) => {
                PipelineError::Transient(err.to_string())
            }
            LlmError::Authentication(_) => PipelineError::FatalConfig(err.to_string()),
            LlmError::Api(_) => PipelineError::LlmMalformed(err.to_string()),
        }
    }
}
