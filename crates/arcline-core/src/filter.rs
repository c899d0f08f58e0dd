//! C4: P2 strategic filter — three-stage classifier (spec §4.4).
//!
//! Grounded in `original_source/apps/filter/enhanced_p2_filter.py` (stage
//! orchestration) and `apps/filter/strategic_gate.py`-style mechanical
//! rules (stage 1, rebuilt here as data rather than scattered `if`s).

use std::sync::Arc;

use crate::config::P2Config;
use crate::domain::Entity;
use crate::traits::GraphIndex;

/// Outcome of the full three-stage filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterVerdict {
    pub keep: bool,
    pub reason: String,
}

impl FilterVerdict {
    fn keep(reason: impl Into<String>) -> Self {
        Self {
            keep: true,
            reason: reason.into(),
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            keep: false,
            reason: reason.into(),
        }
    }
}

/// Stage 1 (mechanical) outcome, before Stage 2/3 run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum MechanicalOutcome {
    Keep(String),
    Reject(String),
    Borderline,
}

/// Ordered mechanical rules over the normalized title text: an actor
/// allow-list, a stop-list (blocks regardless of later signals), and
/// keyword heuristics (spec §4.4 Stage 1).
pub struct MechanicalRules {
    actor_allow_list: Vec<String>,
    stop_list: Vec<String>,
    strategic_keywords: Vec<String>,
}

impl Default for MechanicalRules {
    fn default() -> Self {
        Self {
            actor_allow_list: [
                "united states",
                "us",
                "china",
                "russia",
                "nato",
                "european union",
                "eu",
                "united nations",
                "iran",
                "north korea",
                "ukraine",
                "israel",
                "taiwan",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            stop_list: [
                "celebrity",
                "horoscope",
                "recipe",
                "box office",
                "fashion week",
                "reality tv",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            strategic_keywords: [
                "sanctions",
                "treaty",
                "summit",
                "ceasefire",
                "tariff",
                "missile",
                "troops",
                "election",
                "coup",
                "airstrike",
                "nuclear",
                "embargo",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl MechanicalRules {
    fn filter_title(&self, normalized_title: &str) -> MechanicalOutcome {
        let lower = normalized_title.to_lowercase();

        // Stop-list blocks regardless of any other signal.
        if self.stop_list.iter().any(|s| lower.contains(s.as_str())) {
            return MechanicalOutcome::Reject("blocked_by_stop".to_string());
        }

        if let Some(actor) = self
            .actor_allow_list
            .iter()
            .find(|a| lower.contains(a.as_str()))
        {
            return MechanicalOutcome::Keep(format!("mechanical KEEP: actor allow-list \"{actor}\""));
        }

        if let Some(keyword) = self
            .strategic_keywords
            .iter()
            .find(|k| lower.contains(k.as_str()))
        {
            return MechanicalOutcome::Keep(format!(
                "mechanical KEEP: strategic keyword \"{keyword}\""
            ));
        }

        MechanicalOutcome::Borderline
    }
}

/// The full P2 filter: mechanical -> graph-intelligence -> fallback.
pub struct StrategicFilter {
    rules: MechanicalRules,
    graph: Arc<dyn GraphIndex>,
    config: P2Config,
}

impl StrategicFilter {
    #[must_use]
    pub fn new(graph: Arc<dyn GraphIndex>, config: P2Config) -> Self {
        Self {
            rules: MechanicalRules::default(),
            graph,
            config,
        }
    }

    /// Run all three stages for one title (spec §4.4).
    ///
    /// `title_id` is only needed for the Stage-2 graph lookup; the caller
    /// is responsible for calling `GraphIndex::sync_title` *before* this
    /// runs for any title whose Stage-2 decision should be able to see it
    /// (spec §4.4 state machine note).
    pub async fn evaluate(
        &self,
        title_id: crate::domain::TitleId,
        normalized_title: &str,
        entities: &[Entity],
    ) -> FilterVerdict {
        match self.rules.filter_title(normalized_title) {
            MechanicalOutcome::Keep(reason) => return FilterVerdict::keep(reason),
            MechanicalOutcome::Reject(reason) => return FilterVerdict::reject(reason),
            MechanicalOutcome::Borderline => {}
        }

        // Stage 2 only runs when borderline AND >=2 entities were
        // extracted (spec §8 boundary: 0-entity titles must never enter
        // Stage 2).
        if entities.len() >= self.config.min_entities_for_stage2 {
            match self
                .graph
                .strategic_neighbors(
                    title_id,
                    self.config.stage2_shared_entity_prefilter,
                    self.config.stage2_window_days,
                )
                .await
            {
                Ok(neighbors) => {
                    let promoting = neighbors
                        .iter()
                        .take(self.config.stage2_neighbor_cap)
                        .filter(|n| {
                            n.shared_entity_count
                                >= self.config.stage2_promote_shared_entity_threshold
                        })
                        .count();
                    if promoting > 0 {
                        return FilterVerdict::keep(format!(
                            "connected to {promoting} strategic articles"
                        ));
                    }
                }
                Err(e) => {
                    // Stage 2 is best-effort: a graph error demotes to
                    // Stage 3 without poisoning the verdict (spec §4.4,
                    // §7 "Graph unavailable").
                    tracing::warn!(error = %e, "P2 stage 2 graph lookup failed, demoting to stage 3");
                }
            }
        }

        // Stage 3: fallback.
        FilterVerdict::reject("no_strategic_signal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityType, TitleId};
    use crate::error::Result;
    use async_trait::async_trait;

    struct FakeGraph {
        neighbors: Vec<crate::traits::StrategicNeighbor>,
        fail: bool,
    }

    #[async_trait]
    impl GraphIndex for FakeGraph {
        async fn sync_title(&self, _record: &crate::domain::Title) -> Result<()> {
            Ok(())
        }
        async fn sync_action_triple(
            &self,
            _title_id: TitleId,
            _triple: &crate::domain::ActionTriple,
        ) -> Result<()> {
            Ok(())
        }
        async fn strategic_neighbors(
            &self,
            _title_id: TitleId,
            _min_shared: u32,
            _days: i64,
        ) -> Result<Vec<crate::traits::StrategicNeighbor>> {
            if self.fail {
                return Err(crate::error::PipelineError::GraphUnavailable("down".into()));
            }
            Ok(self.neighbors.clone())
        }
        async fn entity_centrality(
            &self,
            _title_id: TitleId,
            _min_strategic_mentions: u32,
            _days: i64,
        ) -> Result<Vec<crate::traits::EntityCentrality>> {
            Ok(vec![])
        }
        async fn strategic_neighborhood(
            &self,
            _title_id: TitleId,
            _days: i64,
        ) -> Result<crate::traits::Neighborhood> {
            Ok(crate::traits::Neighborhood {
                neighbor_count: 0,
                density: 0.0,
            })
        }
        async fn ongoing_event(
            &self,
            _title_id: TitleId,
            _min_sequence_length: u32,
            _days: i64,
        ) -> Result<bool> {
            Ok(false)
        }
        async fn raw_connectivity_pairs(
            &self,
            _min_shared: u32,
            _limit: usize,
        ) -> Result<Vec<crate::traits::RawPair>> {
            Ok(vec![])
        }
    }

    fn entity(text: &str) -> Entity {
        Entity {
            text: text.to_string(),
            entity_type: EntityType::Gpe,
        }
    }

    #[tokio::test]
    async fn scenario_1_sanctions_mechanical_keep() {
        let graph = Arc::new(FakeGraph {
            neighbors: vec![],
            fail: false,
        });
        let filter = StrategicFilter::new(graph, P2Config::default());
        let verdict = filter
            .evaluate(
                TitleId::new(),
                "us imposes new sanctions on iran",
                &[entity("US"), entity("Iran")],
            )
            .await;
        assert!(verdict.keep);
        assert!(verdict.reason.contains("mechanical KEEP"));
    }

    #[tokio::test]
    async fn scenario_2_celebrity_wedding_non_strategic() {
        let graph = Arc::new(FakeGraph {
            neighbors: vec![],
            fail: false,
        });
        let filter = StrategicFilter::new(graph, P2Config::default());
        let verdict = filter
            .evaluate(
                TitleId::new(),
                "celebrity wedding breaks internet records",
                &[entity("wedding"), entity("internet")],
            )
            .await;
        assert!(!verdict.keep);
        assert_eq!(verdict.reason, "no_strategic_signal");
    }

    #[tokio::test]
    async fn scenario_3_graph_connected_promotes_to_strategic() {
        let graph = Arc::new(FakeGraph {
            neighbors: vec![crate::traits::StrategicNeighbor {
                title_id: TitleId::new(),
                shared_entity_count: 3,
            }],
            fail: false,
        });
        let filter = StrategicFilter::new(graph, P2Config::default());
        let verdict = filter
            .evaluate(
                TitleId::new(),
                "trade negotiations continue in asian markets",
                &[entity("trade"), entity("Asian markets"), entity("negotiations")],
            )
            .await;
        assert!(verdict.keep);
        assert!(verdict.reason.contains("connected to"));
    }

    #[tokio::test]
    async fn zero_entities_never_reach_stage_two() {
        // A graph that would promote on any call; if stage 2 ran despite
        // zero entities, this would incorrectly keep.
        let graph = Arc::new(FakeGraph {
            neighbors: vec![crate::traits::StrategicNeighbor {
                title_id: TitleId::new(),
                shared_entity_count: 10,
            }],
            fail: false,
        });
        let filter = StrategicFilter::new(graph, P2Config::default());
        let verdict = filter
            .evaluate(TitleId::new(), "some ambiguous local story", &[])
            .await;
        assert!(!verdict.keep);
        assert_eq!(verdict.reason, "no_strategic_signal");
    }

    #[tokio::test]
    async fn graph_error_demotes_without_poisoning_verdict() {
        let graph = Arc::new(FakeGraph {
            neighbors: vec![],
            fail: true,
        });
        let filter = StrategicFilter::new(graph, P2Config::default());
        let verdict = filter
            .evaluate(
                TitleId::new(),
                "ambiguous regional development talks",
                &[entity("a"), entity("b")],
            )
            .await;
        assert!(!verdict.keep);
        assert_eq!(verdict.reason, "no_strategic_signal");
    }

    #[tokio::test]
    async fn idempotent_on_rerun() {
        let graph = Arc::new(FakeGraph {
            neighbors: vec![],
            fail: false,
        });
        let filter = StrategicFilter::new(graph, P2Config::default());
        let v1 = filter
            .evaluate(TitleId::new(), "us imposes new sanctions on iran", &[])
            .await;
        let v2 = filter
            .evaluate(TitleId::new(), "us imposes new sanctions on iran", &[])
            .await;
        assert_eq!(v1, v2);
    }
}
