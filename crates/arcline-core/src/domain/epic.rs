//! Epic: a cross-centroid grouping built from tag co-occurrence across EFs
//! in a month (spec Glossary; assembly logic grounded in
//! `original_source/pipeline/epics/build_epics.py`, supplemented in
//! SPEC_FULL.md §3/§4.11).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event_family::EventFamilyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpicId(pub Uuid);

impl EpicId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EpicId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EpicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: EpicId,
    pub month: NaiveDate,
    pub bridge_tags: Vec<String>,
    pub member_ef_ids: Vec<EventFamilyId>,
    pub centroid_count: u32,
    pub title: String,
    pub summary: String,
}

/// An epic candidate prior to the LLM coherence filter (step 4 of the
/// epic-assembly algorithm): a connected component of the bridge-tag
/// Jaccard graph.
#[derive(Debug, Clone, PartialEq)]
pub struct EpicCandidate {
    pub month: NaiveDate,
    pub bridge_tags: Vec<String>,
    pub member_ef_ids: Vec<EventFamilyId>,
    pub centroid_count: u32,
}
