//! C3: connectivity cache refresh (spec §4.3).
//!
//! Pulls raw shared-entity pairs from the graph (C2), rescoring each pair
//! in the driver — never in Cypher — against the titles' full entity sets
//! and normalized primary actors, then replaces the full cache table in
//! one transaction. Grounded in
//! `original_source/apps/generate/connectivity_cache.py`'s
//! `ConnectivityCacheBuilder`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::ConnectivityConfig;
use crate::domain::{ConnectivityRecord, TitleId};
use crate::error::Result;
use crate::traits::{ConnectivityStore, GraphIndex, TitleStore};

/// Orchestrates one full refresh cycle of the pairwise connectivity cache.
pub struct ConnectivityCacheBuilder {
    graph: Arc<dyn GraphIndex>,
    titles: Arc<dyn TitleStore>,
    store: Arc<dyn ConnectivityStore>,
    config: ConnectivityConfig,
}

impl ConnectivityCacheBuilder {
    #[must_use]
    pub fn new(
        graph: Arc<dyn GraphIndex>,
        titles: Arc<dyn TitleStore>,
        store: Arc<dyn ConnectivityStore>,
        config: ConnectivityConfig,
    ) -> Self {
        Self {
            graph,
            titles,
            store,
            config,
        }
    }

    /// Run one full refresh: fetch raw pairs, rescore, floor-filter,
    /// replace the cache table. Returns the number of rows persisted.
    pub async fn refresh(&self) -> Result<usize> {
        let pairs = self
            .graph
            .raw_connectivity_pairs(self.config.min_shared_entities, self.config.max_pairs)
            .await?;

        if pairs.is_empty() {
            self.store.replace_all(Vec::new()).await?;
            return Ok(0);
        }

        let mut title_ids: HashSet<TitleId> = HashSet::new();
        for p in &pairs {
            title_ids.insert(p.title_a);
            title_ids.insert(p.title_b);
        }
        let ids: Vec<TitleId> = title_ids.into_iter().collect();
        let titles = self.titles.get_titles(&ids).await?;

        let mut entity_sets: HashMap<TitleId, HashSet<String>> = HashMap::new();
        let mut actors: HashMap<TitleId, Option<String>> = HashMap::new();
        for t in &titles {
            entity_sets.insert(
                t.id,
                t.entities.iter().map(|e| e.text.to_lowercase()).collect(),
            );
            actors.insert(t.id, t.normalized_primary_actor());
        }

        let mut records = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let empty = HashSet::new();
            let set_a = entity_sets.get(&pair.title_a).unwrap_or(&empty);
            let set_b = entity_sets.get(&pair.title_b).unwrap_or(&empty);
            let jaccard = jaccard_index(set_a, set_b);

            let actor_a = actors.get(&pair.title_a).cloned().flatten();
            let actor_b = actors.get(&pair.title_b).cloned().flatten();
            let actor_match = match (&actor_a, &actor_b) {
                (Some(a), Some(b)) if a == b => 1.0,
                (Some(a), Some(b)) if a.contains(b.as_str()) || b.contains(a.as_str()) => 0.8,
                _ => 0.0,
            };

            let record =
                ConnectivityRecord::new(pair.title_a, pair.title_b, jaccard, actor_match, None);
            if record.meets_floor() {
                records.push(record);
            }
        }

        let count = records.len();
        // `replace_all` is a single delete-then-insert transaction (see
        // trait docs); `insert_batch_size` governs how the store chunks
        // its own internal INSERT statements, not how many times this
        // driver calls it.
        self.store.replace_all(records).await?;
        Ok(count)
    }
}

/// Jaccard index of two string sets: `|A n B| / |A u B|`, `0.0` if both
/// are empty.
#[must_use]
pub fn jaccard_index(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionTriple, Entity, EntityType, Title, Verdict};
    use crate::traits::{Neighborhood, RawPair, SortOrder, StrategicNeighbor};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeGraph {
        pairs: Vec<RawPair>,
    }

    #[async_trait]
    impl GraphIndex for FakeGraph {
        async fn sync_title(&self, _record: &Title) -> Result<()> {
            Ok(())
        }
        async fn sync_action_triple(
            &self,
            _title_id: TitleId,
            _triple: &ActionTriple,
        ) -> Result<()> {
            Ok(())
        }
        async fn strategic_neighbors(
            &self,
            _title_id: TitleId,
            _min_shared: u32,
            _days: i64,
        ) -> Result<Vec<StrategicNeighbor>> {
            Ok(vec![])
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
        ) -> Result<Neighborhood> {
            Ok(Neighborhood {
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
        ) -> Result<Vec<RawPair>> {
            Ok(self.pairs.clone())
        }
    }

    struct FakeTitleStore {
        titles: Vec<Title>,
    }

    #[async_trait]
    impl TitleStore for FakeTitleStore {
        async fn upsert_title(&self, _record: &Title) -> Result<()> {
            Ok(())
        }
        async fn mark_verdict(
            &self,
            _id: TitleId,
            _verdict: Verdict,
            _reason: &str,
            _entities: Vec<Entity>,
            _triple: Option<ActionTriple>,
        ) -> Result<()> {
            Ok(())
        }
        async fn assign_to_ef(
            &self,
            _ids: &[TitleId],
            _ef_id: crate::domain::EventFamilyId,
            _confidence: f64,
            _rationale: &str,
        ) -> Result<usize> {
            Ok(0)
        }
        async fn load_unassigned_strategic(
            &self,
            _limit: usize,
            _order: SortOrder,
        ) -> Result<Vec<Title>> {
            Ok(vec![])
        }
        async fn load_unfiltered(&self, _limit: usize) -> Result<Vec<Title>> {
            Ok(vec![])
        }
        async fn get_title(&self, id: TitleId) -> Result<Option<Title>> {
            Ok(self.titles.iter().find(|t| t.id == id).cloned())
        }
        async fn get_titles(&self, ids: &[TitleId]) -> Result<Vec<Title>> {
            Ok(self
                .titles
                .iter()
                .filter(|t| ids.contains(&t.id))
                .cloned()
                .collect())
        }
    }

    struct FakeConnectivityStore {
        rows: Mutex<Vec<ConnectivityRecord>>,
    }

    #[async_trait]
    impl ConnectivityStore for FakeConnectivityStore {
        async fn replace_all(&self, records: Vec<ConnectivityRecord>) -> Result<()> {
            self.rows.lock().unwrap().extend(records);
            Ok(())
        }
        async fn get_pair(
            &self,
            a: TitleId,
            b: TitleId,
        ) -> Result<Option<ConnectivityRecord>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| (r.title_a == a && r.title_b == b) || (r.title_a == b && r.title_b == a))
                .copied())
        }
        async fn count(&self) -> Result<usize> {
            Ok(self.rows.lock().unwrap().len())
        }
    }

    fn title_with(entities: &[&str], actor: Option<&str>) -> Title {
        let mut t = Title::new("x", "x", "pub", Utc::now(), "en");
        t.entities = entities
            .iter()
            .map(|e| Entity {
                text: (*e).to_string(),
                entity_type: EntityType::Gpe,
            })
            .collect();
        t.action_triple = actor.map(|a| ActionTriple {
            actor: Some(a.to_string()),
            action: "acted".into(),
            target: None,
        });
        t
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a: HashSet<String> = ["x", "y"].into_iter().map(String::from).collect();
        assert!((jaccard_index(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let a: HashSet<String> = ["x"].into_iter().map(String::from).collect();
        let b: HashSet<String> = ["y"].into_iter().map(String::from).collect();
        assert_eq!(jaccard_index(&a, &b), 0.0);
    }

    #[tokio::test]
    async fn refresh_filters_below_floor_and_persists_above() {
        let t1 = title_with(&["iran", "sanctions"], Some("us"));
        let t2 = title_with(&["iran", "sanctions"], Some("us"));
        let t3 = title_with(&["unrelated"], Some("other"));

        let graph = Arc::new(FakeGraph {
            pairs: vec![
                RawPair {
                    title_a: t1.id,
                    title_b: t2.id,
                    shared_entity_count: 2,
                },
                RawPair {
                    title_a: t1.id,
                    title_b: t3.id,
                    shared_entity_count: 0,
                },
            ],
        });
        let titles = Arc::new(FakeTitleStore {
            titles: vec![t1.clone(), t2.clone(), t3.clone()],
        });
        let store = Arc::new(FakeConnectivityStore {
            rows: Mutex::new(vec![]),
        });

        let builder =
            ConnectivityCacheBuilder::new(graph, titles, store.clone(), ConnectivityConfig::default());
        let persisted = builder.refresh().await.unwrap();

        assert_eq!(persisted, 1);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
        let row = store.rows.lock().unwrap()[0];
        assert!(row.meets_floor());
    }

    #[tokio::test]
    async fn substring_actor_match_scores_eight_tenths() {
        let t1 = title_with(&["iran", "sanctions"], Some("united states"));
        let t2 = title_with(&["iran", "sanctions"], Some("united states treasury"));

        let graph = Arc::new(FakeGraph {
            pairs: vec![RawPair {
                title_a: t1.id,
                title_b: t2.id,
                shared_entity_count: 2,
            }],
        });
        let titles = Arc::new(FakeTitleStore {
            titles: vec![t1.clone(), t2.clone()],
        });
        let store = Arc::new(FakeConnectivityStore {
            rows: Mutex::new(vec![]),
        });

        let builder =
            ConnectivityCacheBuilder::new(graph, titles, store.clone(), ConnectivityConfig::default());
        builder.refresh().await.unwrap();

        let row = store.rows.lock().unwrap()[0];
        assert_eq!(row.actor_match, 0.8, "\"united states\" is a substring of \"united states treasury\"");
    }

    #[tokio::test]
    async fn empty_pairs_clears_the_cache() {
        let graph = Arc::new(FakeGraph { pairs: vec![] });
        let titles = Arc::new(FakeTitleStore { titles: vec![] });
        let store = Arc::new(FakeConnectivityStore {
            rows: Mutex::new(vec![]),
        });
        let builder =
            ConnectivityCacheBuilder::new(graph, titles, store.clone(), ConnectivityConfig::default());
        let persisted = builder.refresh().await.unwrap();
        assert_eq!(persisted, 0);
    }
}
