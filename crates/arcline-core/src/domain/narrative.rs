//! Narrative frame: an editorially-attributed interpretation over a set of
//! headlines (spec §3, §4.8).

use serde::{Deserialize, Serialize};

use super::title::TitleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeEntityType {
    Event,
    Ctm,
    Epic,
}

/// A publisher's share of a frame, with its over-index against the
/// entity-wide baseline (spec §4.8 Aggregation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceShare {
    pub publisher: String,
    pub frame_count: u32,
    pub global_count: u32,
    pub over_index: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryShare {
    pub iso_code: String,
    pub count: u32,
}

pub const MAX_TOP_SOURCES: usize = 10;
pub const MAX_PROPORTIONAL_SOURCES: usize = 5;
pub const MAX_TOP_COUNTRIES: usize = 10;
pub const MAX_SAMPLE_TITLES: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeFrame {
    pub entity_type: NarrativeEntityType,
    pub entity_id: String,
    pub label: String,
    pub description: String,
    pub moral_frame: String,
    pub title_count: u32,
    pub top_sources: Vec<SourceShare>,
    pub proportional_sources: Vec<SourceShare>,
    pub top_countries: Vec<CountryShare>,
    pub sample_titles: Vec<TitleId>,
}

impl NarrativeFrame {
    /// Unique key: (entity_id, label) per spec §3 invariant.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.entity_id.clone(), self.label.clone())
    }
}
