//! Neo4j-backed [`GraphIndex`] (spec §4.2): derived bipartite graph of
//! Titles and Entities plus action-triple edges. Grounded in
//! `dashflow-neo4j::Neo4jGraph`'s connect/schema-introspect pattern, with
//! the Cypher kept to graph traversal only — pair scoring for C3 stays in
//! the driver (`arcline-core::connectivity_cache`), per SPEC_FULL §4.3.

pub mod error;
mod graph_index;

pub use error::Neo4jError;

use neo4rs::{Graph, Query};
use tracing::info;

/// `(:Title {id})-[:HAS_ENTITY]->(:Entity {text, entity_type})`, plus
/// `(:Title)-[:HAS_ACTION {role, action}]->(:Entity)` for action-triple
/// endpoints. One index per deployment, shared behind `Arc` the way the
/// teacher shares `Neo4jGraph::graph`.
pub struct Neo4jIndex {
    graph: Graph,
}

impl Neo4jIndex {
    /// Connect and ensure the constraints/indexes this adapter relies on
    /// exist.
    ///
    /// # Errors
    /// Returns [`Neo4jError::Connection`] if the connection fails.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, Neo4jError> {
        info!("connecting to Neo4j");
        let graph = Graph::new(uri, user, password)
            .await
            .map_err(|e| Neo4jError::Connection(e.to_string()))?;

        let index = Self { graph };
        index.ensure_schema().await?;
        Ok(index)
    }

    async fn ensure_schema(&self) -> Result<(), Neo4jError> {
        let statements = [
            "CREATE CONSTRAINT title_id_unique IF NOT EXISTS FOR (t:Title) REQUIRE t.id IS UNIQUE",
            "CREATE CONSTRAINT entity_key_unique IF NOT EXISTS FOR (e:Entity) REQUIRE (e.text, e.entity_type) IS UNIQUE",
            "CREATE INDEX title_verdict_idx IF NOT EXISTS FOR (t:Title) ON (t.verdict)",
            "CREATE INDEX title_published_idx IF NOT EXISTS FOR (t:Title) ON (t.published_at)",
        ];
        for stmt in statements {
            self.graph
                .run(Query::new(stmt.to_string()))
                .await
                .map_err(|e| Neo4jError::Query(e.to_string()))?;
        }
        Ok(())
    }
}
