//! Postgres-specific error type, converted into [`arcline_core::PipelineError`]
//! at the port boundary (teacher pattern:
//! `dashflow-postgres-checkpointer::PostgresError` converting into
//! `dashflow::Error`).

use arcline_core::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("row decode error: {0}")]
    Decode(String),
}

impl From<tokio_postgres::Error> for PostgresError {
    fn from(err: tokio_postgres::Error) -> Self {
        PostgresError::Query(err.to_string())
    }
}

/// Postgres failures surface as [`PipelineError::Transient`] — a dropped
/// connection or a timed-out query is exactly the class of failure the
/// runner retries (spec §7).
impl From<PostgresError> for PipelineError {
    fn from(err: PostgresError) -> Self {
        PipelineError::Transient(err.to_string())
    }
}
