//! Event Family (EF): a coherent strategic event (spec §3, §4.5, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ctm::CtmId;
use super::title::TitleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventFamilyId(pub Uuid);

impl EventFamilyId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventFamilyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventFamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `seed -> active` only; enforced by [`EventFamily::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfStatus {
    Seed,
    Active,
}

/// Closed vocabulary for policy lifecycle stage, used by enrichment Step
/// A. See DESIGN.md for how this vocabulary was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Proposed,
    Announced,
    Enacted,
    InForce,
    Suspended,
    Rescinded,
    UnderReview,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Initiator,
    Target,
    Beneficiary,
    Mediator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalActor {
    pub name: String,
    pub role: ActorRole,
}

/// One extracted magnitude (money/energy/military/casualties/percentage/
/// trade), normalized to a base unit (spec §4.6 Step B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magnitude {
    pub value: f64,
    pub unit: String,
    pub raw_text: String,
}

/// EF context populated by C7/C6 Step C.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfContext {
    pub macro_link: Option<String>,
    pub comparables: Vec<String>,
    pub abnormality: Option<String>,
}

pub const MAX_COMPARABLES: usize = 3;

impl EfContext {
    /// Whether this context carries enough signal to drive the strategic
    /// rewrite in Step D, vs. falling back to the deterministic template.
    #[must_use]
    pub fn is_non_trivial(&self) -> bool {
        self.macro_link.is_some() || !self.comparables.is_empty() || self.abnormality.is_some()
    }
}

/// Enrichment payload written by C6 Step A/B/C.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentPayload {
    pub canonical_actors: Vec<CanonicalActor>,
    pub policy_status: Option<PolicyStatus>,
    pub time_span: Option<(DateTime<Utc>, Option<DateTime<Utc>>)>,
    pub temporal_pattern: Option<String>,
    pub magnitude_baseline: Option<String>,
    pub systemic_context: Option<String>,
    pub magnitudes: Vec<Magnitude>,
    pub official_sources: Vec<String>,
    pub why_strategic: Option<String>,
}

pub const MAX_MAGNITUDES: usize = 3;
pub const MAX_OFFICIAL_SOURCES: usize = 2;
pub const REQUIRED_TAG_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFamily {
    pub id: EventFamilyId,
    pub title: String,
    pub summary: String,
    pub key_actors: Vec<String>,
    pub event_type: String,
    pub primary_theater: String,
    pub event_start: DateTime<Utc>,
    pub event_end: Option<DateTime<Utc>>,
    pub source_title_ids: Vec<TitleId>,
    pub confidence: f64,
    pub coherence_rationale: String,
    pub status: EfStatus,
    pub tags: Vec<String>,
    pub context: EfContext,
    pub enrichment: Option<EnrichmentPayload>,
    /// Centroid bucket this EF was linked into by C7 (spec §4.6 Step A /
    /// §4.7). `None` until the centroid matcher auto-links or an
    /// enrichment operator confirms a medium-confidence candidate.
    pub ctm_id: Option<CtmId>,
}

impl EventFamily {
    /// Whether `event_end >= event_start` or `event_end` is unset — the
    /// only allowed states (spec §3 Title invariants on the EF).
    #[must_use]
    pub fn has_valid_span(&self) -> bool {
        // MSRV-compatible form of `is_none_or` (requires Rust 1.82+).
        self.event_end.map_or(true, |end| end >= self.event_start)
    }

    /// Cardinality bounds enforced on write for an active EF (spec §3,
    /// §8): exactly 3 tags, ≤3 magnitudes, ≤2 official sources, ≤3
    /// comparables.
    #[must_use]
    pub fn satisfies_active_cardinality_bounds(&self) -> bool {
        if self.status != EfStatus::Active {
            return true;
        }
        if self.tags.len() != REQUIRED_TAG_COUNT {
            return false;
        }
        if self.context.comparables.len() > MAX_COMPARABLES {
            return false;
        }
        match &self.enrichment {
            Some(payload) => {
                payload.magnitudes.len() <= MAX_MAGNITUDES
                    && payload.official_sources.len() <= MAX_OFFICIAL_SOURCES
            }
            None => false,
        }
    }

    /// `seed -> active` transition, called once enrichment (C6) completes.
    /// Returns an error if the EF doesn't satisfy the active cardinality
    /// bounds, preventing a half-enriched EF from being marked active.
    pub fn activate(&mut self) -> Result<(), String> {
        if self.status == EfStatus::Active {
            return Ok(());
        }
        if self.tags.len() != REQUIRED_TAG_COUNT {
            return Err(format!(
                "cannot activate EF {}: expected exactly {REQUIRED_TAG_COUNT} tags, found {}",
                self.id,
                self.tags.len()
            ));
        }
        self.status = EfStatus::Active;
        Ok(())
    }
}
