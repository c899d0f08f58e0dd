//! Error taxonomy for the Arcline pipeline (spec §7).
//!
//! Kinds, not exhaustive types: each variant groups a class of failure the
//! runner treats uniformly. Adapter crates (`arcline-postgres`,
//! `arcline-neo4j`, `arcline-llm`) define their own leaf errors and convert
//! into [`PipelineError`] at the port boundary rather than leaking driver
//! types into core logic.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error taxonomy matching spec §7's kinds.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// DB connection drop, graph timeout, LLM 5xx/timeout. Retried by the
    /// runner with bounded exponential backoff.
    #[error("transient infrastructure failure: {0}")]
    Transient(String),

    /// Non-JSON or schema-violating LLM output. One in-place retry at lower
    /// temperature is attempted by the caller before this surfaces.
    #[error("LLM returned malformed output: {0}")]
    LlmMalformed(String),

    /// Graph store unreachable. Stage 2 of P2 demotes silently to Stage 3
    /// when this occurs there; a C3 refresh aborts the whole run instead.
    #[error("graph store unavailable: {0}")]
    GraphUnavailable(String),

    /// A record fails a validation rule (id outside batch, tag count != 3,
    /// confidence outside [0,1], …). Per-item drop with a logged reason;
    /// other items proceed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A write would break a hard invariant (title already has an EF, frame
    /// label collision, …). Hard stop for the item; the runner does not
    /// retry, but the checkpoint still advances past it.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Missing API key, unreachable DB at startup, bad config file. The
    /// process exits 1 before any work starts.
    #[error("fatal configuration error: {0}")]
    FatalConfig(String),
}

impl PipelineError {
    /// Whether the runner should retry this item (bounded, with backoff)
    /// rather than drop or hard-stop it.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Transient(_))
    }

    /// Whether this error should be logged and skipped without aborting
    /// the surrounding stage.
    #[must_use]
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_)
                | PipelineError::InvariantViolation(_)
                | PipelineError::LlmMalformed(_)
        )
    }
}
