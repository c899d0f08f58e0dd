//! Neo4j-specific error type, converted into [`arcline_core::PipelineError`]
//! at the port boundary (teacher pattern: `dashflow-neo4j`'s direct mapping
//! of `neo4rs` errors onto `dashflow::core::Error::other`).

use arcline_core::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum Neo4jError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("row decode error: {0}")]
    Decode(String),
}

/// Graph failures surface as [`PipelineError::GraphUnavailable`] — C4's
/// Stage 2 and C3's refresh both treat a graph error as "no boost"/
/// "no pairs this run" rather than a hard failure (spec §4.4, §4.3).
impl From<Neo4jError> for PipelineError {
    fn from(err: Neo4jError) -> Self {
        PipelineError::GraphUnavailable(err.to_string())
    }
}
