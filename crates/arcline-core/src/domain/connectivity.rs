//! Pairwise connectivity cache record (spec §3, §4.3).

use serde::{Deserialize, Serialize};

use super::title::TitleId;

/// Precomputed similarity between two unassigned strategic titles.
///
/// Invariant: `title_a < title_b` (enforced by [`ConnectivityRecord::new`]),
/// and `composite` is in `[0.3, 1.0]` wherever it is stored — rows below
/// the 0.3 floor are never persisted (spec §3, §8 testable properties).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityRecord {
    pub title_a: TitleId,
    pub title_b: TitleId,
    pub entity_jaccard: f64,
    pub actor_match: f64,
    pub composite: f64,
    pub shared_actor: Option<usize>,
}

/// Composite connectivity score, capped at 0.7 by construction (0.5·jaccard
/// + 0.2·actor_match). This is deliberately a ranking score, not a
/// probability — see spec §9 Open Questions; call sites that need a
/// probability-like "strong" threshold should read `entity_jaccard`
/// directly, not `composite`.
#[must_use]
pub fn composite_score(entity_jaccard: f64, actor_match: f64) -> f64 {
    0.5 * entity_jaccard + 0.2 * actor_match
}

/// Minimum composite score for a connectivity row to be persisted.
pub const COMPOSITE_FLOOR: f64 = 0.3;

impl ConnectivityRecord {
    /// Build a record, canonicalizing the pair so the lexicographically
    /// smaller id is always `title_a`. `shared_actor` holds the index of
    /// the representative actor string in a caller-maintained interner,
    /// kept as an opaque token here since the cache layer itself has no
    /// opinion on actor text beyond equality.
    pub fn new(
        a: TitleId,
        b: TitleId,
        entity_jaccard: f64,
        actor_match: f64,
        shared_actor: Option<usize>,
    ) -> Self {
        let (title_a, title_b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            title_a,
            title_b,
            entity_jaccard,
            actor_match,
            composite: composite_score(entity_jaccard, actor_match),
            shared_actor,
        }
    }

    /// Whether this record clears the persistence floor.
    #[must_use]
    pub fn meets_floor(&self) -> bool {
        self.composite >= COMPOSITE_FLOOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_is_capped_at_point_seven() {
        assert!((composite_score(1.0, 1.0) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn canonicalizes_pair_order() {
        let a = TitleId::new();
        let b = TitleId::new();
        let r1 = ConnectivityRecord::new(a, b, 0.5, 1.0, None);
        let r2 = ConnectivityRecord::new(b, a, 0.5, 1.0, None);
        assert_eq!(r1, r2);
        assert!(r1.title_a <= r1.title_b);
    }

    #[test]
    fn floor_excludes_low_composite() {
        let r = ConnectivityRecord::new(TitleId::new(), TitleId::new(), 0.1, 0.0, None);
        assert!(!r.meets_floor());
    }
}
