//! Title: one news headline, and everything P2/P3 attach to it (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event_family::EventFamilyId;

/// Opaque title identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TitleId(pub Uuid);

impl TitleId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TitleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A title's strategic verdict. Terminal once set to `Strategic` or
/// `NonStrategic` (spec §4.4 state machine: `unfiltered -> (strategic |
/// non-strategic)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Unfiltered,
    Strategic,
    NonStrategic,
}

/// Processing status, orthogonal to the verdict: tracks which pipeline
/// stage currently owns the title so a single item can't be in two stages
/// at once (spec §4.9 concurrency note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Filtered,
    Assigned,
    Failed,
}

/// Named entity type tags. `Other` carries through anything the extractor
/// produced that isn't one of the well-known PERSON/GPE/ORG/EVENT classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Gpe,
    Org,
    Event,
    Other(String),
}

/// A named real-world referent, identified by (text, type) composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub entity_type: EntityType,
}

/// Structured `(actor?, action, target?)` extracted per title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTriple {
    pub actor: Option<String>,
    pub action: String,
    pub target: Option<String>,
}

impl ActionTriple {
    /// An action triple with no actor and no target carries nothing the
    /// graph can project as an edge; such triples are a no-op for
    /// [`crate::traits::GraphIndex::sync_action_triple`] (spec §4.2).
    #[must_use]
    pub fn is_complete_enough_for_graph(&self) -> bool {
        self.actor.is_some() || self.target.is_some()
    }
}

/// A title's assignment to an Event Family, with the confidence and
/// rationale the assembler (C5) produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfAssignment {
    pub ef_id: EventFamilyId,
    pub confidence: f64,
    pub rationale: String,
}

/// One ingested headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub id: TitleId,
    pub display_text: String,
    pub normalized_text: String,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
    pub language: String,
    pub iso_country: Option<String>,
    pub verdict: Verdict,
    pub verdict_reason: Option<String>,
    pub actors: Vec<String>,
    pub entities: Vec<Entity>,
    pub action_triple: Option<ActionTriple>,
    pub ef_assignment: Option<EfAssignment>,
    pub status: ProcessingStatus,
}

impl Title {
    /// A fresh title as P1 would hand it off: unfiltered verdict, pending
    /// status, no entities/triple/assignment yet.
    #[must_use]
    pub fn new(
        display_text: impl Into<String>,
        normalized_text: impl Into<String>,
        publisher: impl Into<String>,
        published_at: DateTime<Utc>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: TitleId::new(),
            display_text: display_text.into(),
            normalized_text: normalized_text.into(),
            publisher: publisher.into(),
            published_at,
            language: language.into(),
            iso_country: None,
            verdict: Verdict::Unfiltered,
            verdict_reason: None,
            actors: Vec::new(),
            entities: Vec::new(),
            action_triple: None,
            ef_assignment: None,
            status: ProcessingStatus::Pending,
        }
    }

    /// Primary actor from the action triple, if any, lower-cased and
    /// trimmed — the form used throughout C3/C7 actor matching.
    #[must_use]
    pub fn normalized_primary_actor(&self) -> Option<String> {
        self.action_triple
            .as_ref()
            .and_then(|t| t.actor.as_ref())
            .map(|a| a.to_lowercase().trim().to_string())
    }

    /// A title with verdict=strategic and no EF reference is eligible for
    /// P3 assembly (spec §4.1 `load_unassigned_strategic`).
    #[must_use]
    pub fn is_unassigned_strategic(&self) -> bool {
        self.verdict == Verdict::Strategic && self.ef_assignment.is_none()
    }
}
