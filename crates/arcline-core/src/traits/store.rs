//! Storage ports: C1 (titles/EFs), C3's storage half (connectivity cache),
//! plus centroid config, CTM, narrative frame, and epic storage (spec §4.1,
//! §4.3, §6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    ActionTriple, Centroid, ConnectivityRecord, Ctm, CtmId, Entity, Epic, EventFamily,
    EventFamilyId, NarrativeEntityType, NarrativeFrame, Title, TitleId, Verdict,
};
use crate::error::Result;

/// Sort order for [`TitleStore::load_unassigned_strategic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    PublicationDescending,
    PublicationAscending,
}

/// C1: canonical record of every headline (spec §4.1).
///
/// Every mutation is expressed as an idempotent SQL statement keyed by
/// title identifier; implementations enforce the single-EF invariant via
/// a unique partial index rather than an application-level check alone.
#[async_trait]
pub trait TitleStore: Send + Sync {
    /// Insert or update by identifier. Fails with
    /// [`crate::error::PipelineError::InvariantViolation`] if an
    /// already-set immutable field (entities, action triple) differs from
    /// the incoming record.
    async fn upsert_title(&self, record: &Title) -> Result<()>;

    /// Atomic set of all P2 outputs. Precondition: current verdict is
    /// `Unfiltered`.
    async fn mark_verdict(
        &self,
        id: TitleId,
        verdict: Verdict,
        reason: &str,
        entities: Vec<Entity>,
        triple: Option<ActionTriple>,
    ) -> Result<()>;

    /// Batch assignment. Fails per-title (without aborting the others) if
    /// the current EF reference is non-null. Returns the count actually
    /// assigned.
    async fn assign_to_ef(
        &self,
        ids: &[TitleId],
        ef_id: EventFamilyId,
        confidence: f64,
        rationale: &str,
    ) -> Result<usize>;

    /// Titles with verdict=strategic and no EF, ordered by publication
    /// date. Defaults to descending (newest first) per spec §4.1.
    async fn load_unassigned_strategic(
        &self,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<Title>>;

    /// Titles still awaiting a P2 verdict, oldest first — the queue the
    /// P2 CLI runner drains (spec §4.4 state machine entry point).
    async fn load_unfiltered(&self, limit: usize) -> Result<Vec<Title>>;

    async fn get_title(&self, id: TitleId) -> Result<Option<Title>>;

    async fn get_titles(&self, ids: &[TitleId]) -> Result<Vec<Title>>;
}

/// C1's EF half: create/update Event Families (spec §4.5, §4.6).
#[async_trait]
pub trait EventFamilyStore: Send + Sync {
    async fn create_ef(&self, ef: &EventFamily) -> Result<()>;

    async fn get_ef(&self, id: EventFamilyId) -> Result<Option<EventFamily>>;

    /// Replace the full EF row (used by C6's Step E finalize and by tag/
    /// context writes). Implementations must enforce the cardinality
    /// bounds from spec §3/§8 before committing.
    async fn update_ef(&self, ef: &EventFamily) -> Result<()>;

    /// EFs eligible for enrichment (status=seed), for C6's prioritization
    /// queue.
    async fn load_seed_efs(&self, limit: usize) -> Result<Vec<EventFamily>>;

    /// Active EFs in a given month with the given centroid reference
    /// (through their CTM), for epic assembly (SPEC_FULL §4.11).
    async fn load_active_efs_for_month(
        &self,
        month: chrono::NaiveDate,
    ) -> Result<Vec<EventFamily>>;
}

/// C3's storage half: pairwise connectivity rows (spec §4.3).
#[async_trait]
pub trait ConnectivityStore: Send + Sync {
    /// Full-refresh semantics: delete all rows touching unassigned
    /// titles, then bulk-insert `records` in batches, committing once
    /// (spec §4.3 step 6).
    async fn replace_all(&self, records: Vec<ConnectivityRecord>) -> Result<()>;

    async fn get_pair(&self, a: TitleId, b: TitleId) -> Result<Option<ConnectivityRecord>>;

    async fn count(&self) -> Result<usize>;
}

/// Centroid configuration, immutable at runtime (spec §3, §4.7).
#[async_trait]
pub trait CentroidStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<Centroid>>;
}

/// CTM bucket storage (spec §3, §4.8).
#[async_trait]
pub trait CtmStore: Send + Sync {
    async fn get(&self, id: &CtmId) -> Result<Option<Ctm>>;

    async fn upsert(&self, ctm: &Ctm) -> Result<()>;

    async fn load_unfrozen(&self) -> Result<Vec<Ctm>>;

    async fn record_summary(
        &self,
        id: &CtmId,
        summary_text: String,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Narrative frame storage, exclusively owned by C8 (spec §3, §4.8).
#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Atomic refresh: delete existing frames for `entity_id`, then insert
    /// `frames`, in one transaction — at no point are both the old and
    /// new sets visible (spec §4.8, §8 idempotence property).
    async fn replace_frames(
        &self,
        entity_type: NarrativeEntityType,
        entity_id: &str,
        frames: Vec<NarrativeFrame>,
    ) -> Result<()>;

    async fn load_frames(
        &self,
        entity_type: NarrativeEntityType,
        entity_id: &str,
    ) -> Result<Vec<NarrativeFrame>>;
}

/// Epic storage (SPEC_FULL §3/§4.11).
#[async_trait]
pub trait EpicStore: Send + Sync {
    async fn create(&self, epic: &Epic) -> Result<()>;

    async fn load_for_month(&self, month: chrono::NaiveDate) -> Result<Vec<Epic>>;
}
