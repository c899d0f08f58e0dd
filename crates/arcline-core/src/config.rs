//! Per-stage configuration structs carrying only the tunables actually
//! read (Design Notes "kwarg soup" item). Defaults are centralized here;
//! nothing silently falls back to an undocumented value.
//!
//! Loaded from an optional TOML file (teacher workspace already depends on
//! `toml`) with environment-variable overrides applied explicitly by the
//! caller (see `arcline-cli`'s config wiring) — never a hidden global.

use serde::{Deserialize, Serialize};

/// C4 (P2 strategic filter) tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct P2Config {
    /// Minimum entities required before Stage 2 may run at all (spec §8
    /// boundary: a title with 0 entities must never enter Stage 2).
    pub min_entities_for_stage2: usize,
    /// Shared-entity floor for the Stage-2 pre-filter query (spec §4.4:
    /// "threshold=2"; flagged in spec §9 as possibly not driving any
    /// keep since promotion needs >=3).
    pub stage2_shared_entity_prefilter: u32,
    /// Shared-entity count a neighbor must meet to actually promote to
    /// strategic in Stage 2.
    pub stage2_promote_shared_entity_threshold: u32,
    /// Lookback window for Stage 2's neighbor query, in days.
    pub stage2_window_days: i64,
    /// Cap on neighbors considered in Stage 2.
    pub stage2_neighbor_cap: usize,
}

impl Default for P2Config {
    fn default() -> Self {
        Self {
            min_entities_for_stage2: 2,
            stage2_shared_entity_prefilter: 2,
            stage2_promote_shared_entity_threshold: 3,
            stage2_window_days: 2,
            stage2_neighbor_cap: 3,
        }
    }
}

/// C3 (connectivity cache refresh) tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub min_shared_entities: u32,
    pub max_pairs: usize,
    pub insert_batch_size: usize,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            min_shared_entities: 2,
            max_pairs: 50_000,
            insert_batch_size: 1_000,
        }
    }
}

/// C5 (P3 EF assembler) tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct P3Config {
    /// Default: entire backlog (`None` via 0 meaning "no cap" at the
    /// call site; kept as `usize::MAX` here so the type stays non-optional
    /// and the "no silent fallback" rule holds — `usize::MAX` is an
    /// explicit, documented sentinel, not an implicit default).
    pub max_titles: usize,
    pub batch_size: usize,
    pub retry_temperature: f32,
}

impl Default for P3Config {
    fn default() -> Self {
        Self {
            max_titles: usize::MAX,
            batch_size: 50,
            retry_temperature: 0.1,
        }
    }
}

/// C6 (enrichment) tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub recent_titles_for_step_a: usize,
    pub daily_cap: usize,
    /// Narrative rewrite target word-count band (spec §4.6 Step D).
    pub rewrite_min_words: usize,
    pub rewrite_max_words: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            recent_titles_for_step_a: 5,
            daily_cap: 200,
            rewrite_min_words: 150,
            rewrite_max_words: 250,
        }
    }
}

/// C7 (centroid matcher) confidence bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentroidMatcherConfig {
    pub high_confidence_floor: f64,
    pub medium_confidence_floor: f64,
    pub fuzzy_match_ratio: f64,
}

impl Default for CentroidMatcherConfig {
    fn default() -> Self {
        Self {
            high_confidence_floor: 0.7,
            medium_confidence_floor: 0.4,
            fuzzy_match_ratio: 0.8,
        }
    }
}

/// C8 (narrative frame extractor) tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub ctm_sample_cap: usize,
    pub epic_sample_cap: usize,
    pub event_min_frames: usize,
    pub event_max_frames: usize,
    pub ctm_epic_min_frames: usize,
    pub ctm_epic_max_frames: usize,
    pub classification_batch_size: usize,
    pub min_titles_per_publisher_per_frame: u32,
    pub top_source_over_index_floor: f64,
    pub proportional_band_low: f64,
    pub proportional_band_high: f64,
    pub proportional_min_global_count: u32,
    pub min_titles_for_ctm: u32,
    pub min_titles_for_event_extraction: usize,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            ctm_sample_cap: 200,
            epic_sample_cap: 150,
            event_min_frames: 2,
            event_max_frames: 5,
            ctm_epic_min_frames: 3,
            ctm_epic_max_frames: 5,
            classification_batch_size: 60,
            min_titles_per_publisher_per_frame: 3,
            top_source_over_index_floor: 1.3,
            proportional_band_low: 0.85,
            proportional_band_high: 1.15,
            proportional_min_global_count: 20,
            min_titles_for_ctm: crate::domain::ctm::DEFAULT_MIN_TITLES_FOR_EXTRACTION,
            min_titles_for_event_extraction: 5,
        }
    }
}

/// C9 (runner) tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub llm_concurrency: usize,
    pub item_concurrency: usize,
    pub max_retries: u32,
    pub llm_timeout_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            llm_concurrency: 3,
            item_concurrency: 8,
            max_retries: 3,
            llm_timeout_secs: 120,
        }
    }
}

/// SPEC_FULL §4.11 epic-assembly tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpicConfig {
    pub min_centroids: u32,
    pub min_sources: u32,
    pub min_jaccard: f64,
}

impl Default for EpicConfig {
    fn default() -> Self {
        Self {
            min_centroids: 8,
            min_sources: 5,
            min_jaccard: 0.15,
        }
    }
}

/// The full set of per-stage configuration, as loaded from an optional
/// TOML file (`arcline.toml`) via [`PipelineConfig::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub p2: P2Config,
    pub connectivity: ConnectivityConfig,
    pub p3: P3Config,
    pub enrichment: EnrichmentConfig,
    pub centroid_matcher: CentroidMatcherConfig,
    pub narrative: NarrativeConfig,
    pub runner: RunnerConfig,
    pub epic: EpicConfig,
}

impl PipelineConfig {
    /// Parse from a TOML string. Missing sections fall back to their
    /// `Default` impl (every field is documented above; there is no
    /// additional, undocumented fallback path).
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_documented_defaults() {
        let cfg = PipelineConfig::from_toml("").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.p3.batch_size, 50);
        assert_eq!(cfg.runner.llm_concurrency, 3);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg = PipelineConfig::from_toml("[p3]\nbatch_size = 10\n").unwrap();
        assert_eq!(cfg.p3.batch_size, 10);
        assert_eq!(cfg.p3.retry_temperature, 0.1);
    }
}
