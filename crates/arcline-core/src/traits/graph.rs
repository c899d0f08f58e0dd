//! C2 Graph Index port: derived bipartite graph of Titles<->Entities plus
//! action triples (spec §4.2).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ActionTriple, Title, TitleId};
use crate::error::Result;

/// A strategic title sharing entities with the query title, used by P2
/// Stage 2 (spec §4.2 `strategic_neighbors`, §4.4 Stage 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicNeighbor {
    pub title_id: TitleId,
    pub shared_entity_count: u32,
}

/// An entity on the query title whose strategic-mention count meets a
/// threshold (spec §4.2 `entity_centrality`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCentrality {
    pub entity_text: String,
    pub strategic_mention_count: u32,
}

/// `{neighbor_count, density}` for a title's local strategic neighborhood
/// (spec §4.2 `strategic_neighborhood`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub neighbor_count: u32,
    pub density: f64,
}

/// A raw `(title1_id, title2_id, shared_count)` tuple as fetched from the
/// graph for C3's refresh — scoring itself happens in the driver, never in
/// Cypher (spec §4.3 step 1-2; Design Notes "Graph edges rebuilt inside
/// the graph store" item).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPair {
    pub title_a: TitleId,
    pub title_b: TitleId,
    pub shared_entity_count: u32,
}

/// Port for the graph-backed connectivity index (C2).
///
/// All reads are read-only; the graph is authoritative only for edges it
/// derived itself (titles/EFs remain owned by C1/Postgres). Sync methods
/// are best-effort: implementations log failures internally and the trait
/// signature still returns `Result` so callers can decide whether to
/// surface or swallow it, but per spec §4.2 a `sync_*` failure must never
/// propagate back into C1's own write path.
#[async_trait]
pub trait GraphIndex: Send + Sync {
    /// Upsert the Title node, upsert Entity nodes, (re)link `HAS_ENTITY`
    /// edges.
    async fn sync_title(&self, record: &Title) -> Result<()>;

    /// Add directed `HAS_ACTION` edges Title->Entity with role and action.
    /// No-op if the triple is incomplete (spec §4.2).
    async fn sync_action_triple(&self, title_id: TitleId, triple: &ActionTriple) -> Result<()>;

    /// Top strategic titles sharing >= `min_shared` entities within
    /// `days`, capped at 3 (spec §4.2, §4.4 Stage 2).
    async fn strategic_neighbors(
        &self,
        title_id: TitleId,
        min_shared: u32,
        days: i64,
    ) -> Result<Vec<StrategicNeighbor>>;

    /// Entities on this title whose strategic-mention count meets
    /// `min_strategic_mentions` within `days`.
    async fn entity_centrality(
        &self,
        title_id: TitleId,
        min_strategic_mentions: u32,
        days: i64,
    ) -> Result<Vec<EntityCentrality>>;

    /// `{neighbor_count, density}` for this title's local neighborhood.
    async fn strategic_neighborhood(&self, title_id: TitleId, days: i64) -> Result<Neighborhood>;

    /// True if any entity on this title participates in a temporal
    /// sequence of >= `min_sequence_length` strategic mentions.
    async fn ongoing_event(
        &self,
        title_id: TitleId,
        min_sequence_length: u32,
        days: i64,
    ) -> Result<bool>;

    /// Raw pairwise shared-entity counts for unassigned strategic titles,
    /// capped at `limit`, feeding C3's refresh (spec §4.3 step 1).
    async fn raw_connectivity_pairs(&self, min_shared: u32, limit: usize) -> Result<Vec<RawPair>>;
}
