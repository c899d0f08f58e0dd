//! C7: centroid matcher — pure, deterministic scoring of an Event Family
//! against the predeclared centroid list (spec §4.7).
//!
//! Grounded in `original_source/apps/enrich/centroid_matcher.py`'s
//! `CentroidMatcher` class: keyword/actor/theater/event-type component
//! scores combined into one composite (40/30/20/10 weights), banded into
//! high/medium/low confidence. The actor-variant table, theater-hierarchy
//! table, and event-type bonus table below are carried over verbatim from
//! that module's `_build_actor_variants`/`_build_theater_hierarchy`/
//! `_build_event_type_bonuses`.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::CentroidMatcherConfig;
use crate::domain::{Centroid, EventFamily};

/// Confidence band a composite score falls into (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// >= `high_confidence_floor`: auto-link without an LLM call.
    High,
    /// Between the medium and high floors: needs an LLM tie-break.
    Medium,
    /// Below `medium_confidence_floor`: not a match.
    Low,
}

/// One centroid's score against a given EF context.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidMatch<'a> {
    pub centroid: &'a Centroid,
    pub keyword_score: f64,
    pub actor_score: f64,
    pub theater_score: f64,
    pub event_type_score: f64,
    pub composite: f64,
    pub confidence: Confidence,
}

/// Canonical actor name -> its recognized surface variants, lower-cased.
static ACTOR_VARIANTS: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    HashMap::from([
        ("united states", vec!["us", "usa", "america", "united states"]),
        ("china", vec!["china", "prc", "peoples republic of china"]),
        ("russia", vec!["russia", "russian federation", "rf"]),
        ("european union", vec!["eu", "european union"]),
        (
            "united kingdom",
            vec!["uk", "britain", "united kingdom", "great britain"],
        ),
        (
            "north korea",
            vec!["north korea", "dprk", "democratic peoples republic of korea"],
        ),
        ("south korea", vec!["south korea", "rok", "republic of korea"]),
    ])
});

/// Geographic theater -> the sub-regions/countries it contains.
static THEATER_HIERARCHY: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    HashMap::from([
        ("eastern europe", vec!["ukraine", "poland", "belarus", "baltic states"]),
        (
            "middle east",
            vec!["israel", "gaza", "west bank", "syria", "lebanon", "jordan"],
        ),
        (
            "persian gulf",
            vec!["iran", "iraq", "kuwait", "bahrain", "qatar", "uae"],
        ),
        (
            "southeast asia",
            vec!["myanmar", "thailand", "vietnam", "laos", "cambodia"],
        ),
        ("south asia", vec!["india", "pakistan", "bangladesh", "sri lanka"]),
        ("east china sea", vec!["taiwan strait"]),
        ("south china sea", vec!["spratly islands", "paracel islands"]),
        ("west africa", vec!["mali", "niger", "burkina faso", "ghana"]),
        ("horn of africa", vec!["ethiopia", "eritrea", "somalia", "djibouti"]),
        ("balkans", vec!["serbia", "kosovo", "bosnia", "montenegro", "albania"]),
    ])
});

/// event_type -> centroid id -> bonus added to the composite's event-type
/// component.
static EVENT_TYPE_BONUSES: LazyLock<HashMap<&'static str, HashMap<&'static str, f64>>> =
    LazyLock::new(|| {
        HashMap::from([
            (
                "military_conflict",
                HashMap::from([
                    ("ARC-UKR", 0.2),
                    ("ARC-MIDEAST-ISR", 0.2),
                    ("ARC-CHN-TWN", 0.15),
                    ("ARC-KOREA", 0.15),
                ]),
            ),
            (
                "political_violence",
                HashMap::from([("ARC-US-ELECT", 0.15), ("ARC-MYANMAR", 0.1)]),
            ),
            (
                "cyber_attack",
                HashMap::from([("ARC-TECH", 0.2), ("ARC-INFOOPS", 0.15)]),
            ),
            (
                "energy_crisis",
                HashMap::from([("ARC-ENERGY", 0.25), ("ARC-CLIMATE", 0.1)]),
            ),
            (
                "trade_dispute",
                HashMap::from([("ARC-TRADE", 0.25), ("ARC-TECH", 0.1)]),
            ),
        ])
    });

fn normalize_actor(actor: &str) -> String {
    let lower = actor.to_lowercase();
    for (canonical, variants) in ACTOR_VARIANTS.iter() {
        if variants.contains(&lower.as_str()) {
            return (*canonical).to_string();
        }
    }
    lower
}

/// Pure scorer. Holds only tunables, no I/O.
pub struct CentroidMatcher {
    config: CentroidMatcherConfig,
}

impl CentroidMatcher {
    #[must_use]
    pub fn new(config: CentroidMatcherConfig) -> Self {
        Self { config }
    }

    fn band(&self, composite: f64) -> Confidence {
        if composite >= self.config.high_confidence_floor {
            Confidence::High
        } else if composite >= self.config.medium_confidence_floor {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Keyword overlap: each centroid keyword scores 1.0 for an exact
    /// substring hit in the joined EF text, or 0.7 if no exact hit but some
    /// word in the text is a fuzzy match (ratio >= `fuzzy_match_ratio`),
    /// summed and capped at 1.0 of the keyword count.
    fn keyword_score(&self, centroid: &Centroid, haystack: &str) -> f64 {
        if centroid.keywords.is_empty() {
            return 0.0;
        }
        let words: Vec<&str> = haystack.split_whitespace().collect();
        let mut matches = 0.0;
        for keyword in &centroid.keywords {
            let keyword_lower = keyword.to_lowercase();
            if haystack.contains(keyword_lower.as_str()) {
                matches += 1.0;
            } else if words
                .iter()
                .any(|w| strsim::normalized_levenshtein(&keyword_lower, w) >= self.config.fuzzy_match_ratio)
            {
                matches += 0.7;
            }
        }
        (matches / centroid.keywords.len() as f64).min(1.0)
    }

    /// Actor overlap: fraction of the centroid's actor list matched by the
    /// EF's canonical actors, after expanding both sides through the
    /// actor-variant table (e.g. "US" and "United States" normalize to the
    /// same canonical form).
    fn actor_score(&self, centroid: &Centroid, ef_actors: &[String]) -> f64 {
        if centroid.actors.is_empty() || ef_actors.is_empty() {
            return 0.0;
        }
        let normalized_ef: std::collections::HashSet<String> =
            ef_actors.iter().map(|a| normalize_actor(a)).collect();
        let normalized_centroid: Vec<String> =
            centroid.actors.iter().map(|a| normalize_actor(a)).collect();
        let hits = normalized_centroid
            .iter()
            .filter(|a| normalized_ef.contains(*a))
            .count();
        hits as f64 / normalized_centroid.len() as f64
    }

    /// Theater overlap: 1.0 direct match, 0.8 if the EF's theater is a
    /// hierarchical child of one of the centroid's theaters, 0.6 on a fuzzy
    /// string match, else 0.0.
    fn theater_score(&self, centroid: &Centroid, primary_theater: &str) -> f64 {
        if centroid.theaters.is_empty() || primary_theater.is_empty() {
            return 0.0;
        }
        let ef_theater_lower = primary_theater.to_lowercase();
        let centroid_theaters_lower: Vec<String> =
            centroid.theaters.iter().map(|t| t.to_lowercase()).collect();

        if centroid_theaters_lower.iter().any(|t| t == &ef_theater_lower) {
            return 1.0;
        }

        for (parent, children) in THEATER_HIERARCHY.iter() {
            if centroid_theaters_lower.iter().any(|t| t == parent) && children.contains(&ef_theater_lower.as_str())
            {
                return 0.8;
            }
        }

        if centroid_theaters_lower
            .iter()
            .any(|t| strsim::normalized_levenshtein(&ef_theater_lower, t) >= self.config.fuzzy_match_ratio)
        {
            return 0.6;
        }

        0.0
    }

    /// Event-type alignment: the configured bonus for this (event_type,
    /// centroid id) pair, or 0.0 if no bonus is configured.
    fn event_type_score(&self, centroid: &Centroid, event_type: &str) -> f64 {
        if event_type.is_empty() {
            return 0.0;
        }
        EVENT_TYPE_BONUSES
            .get(event_type)
            .and_then(|bonuses| bonuses.get(centroid.id.as_str()))
            .copied()
            .unwrap_or(0.0)
    }

    /// Score one centroid against an Event Family.
    #[must_use]
    pub fn score<'a>(&self, centroid: &'a Centroid, ef: &EventFamily) -> CentroidMatch<'a> {
        let haystack = format!("{} {}", ef.title.to_lowercase(), ef.summary.to_lowercase());
        let keyword_score = self.keyword_score(centroid, &haystack);
        let actor_score = self.actor_score(centroid, &ef.key_actors);
        let theater_score = self.theater_score(centroid, &ef.primary_theater);
        let event_type_score = self.event_type_score(centroid, &ef.event_type);

        let composite =
            0.4 * keyword_score + 0.3 * actor_score + 0.2 * theater_score + 0.1 * event_type_score;

        CentroidMatch {
            centroid,
            keyword_score,
            actor_score,
            theater_score,
            event_type_score,
            composite,
            confidence: self.band(composite),
        }
    }

    /// Score every centroid and return the top `n` by composite,
    /// descending (spec §4.7 `top_candidates`).
    #[must_use]
    pub fn top_candidates<'a>(
        &self,
        centroids: &'a [Centroid],
        ef: &EventFamily,
        n: usize,
    ) -> Vec<CentroidMatch<'a>> {
        let mut scored: Vec<_> = centroids.iter().map(|c| self.score(c, ef)).collect();
        scored.sort_by(|a, b| b.composite.partial_cmp(&a.composite).unwrap());
        scored.truncate(n);
        scored
    }
}
