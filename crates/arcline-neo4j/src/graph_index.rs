//! [`GraphIndex`] impl for [`Neo4jIndex`] (spec §4.2).

use arcline_core::domain::{ActionTriple, Title, TitleId};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::{EntityCentrality, GraphIndex, Neighborhood, RawPair, StrategicNeighbor};
use async_trait::async_trait;
use chrono::Utc;
use neo4rs::Query;

use crate::{Neo4jError, Neo4jIndex};

fn verdict_str(t: &Title) -> &'static str {
    match t.verdict {
        arcline_core::domain::Verdict::Unfiltered => "unfiltered",
        arcline_core::domain::Verdict::Strategic => "strategic",
        arcline_core::domain::Verdict::NonStrategic => "non_strategic",
    }
}

fn entity_type_str(t: &arcline_core::domain::EntityType) -> String {
    use arcline_core::domain::EntityType::*;
    match t {
        Person => "person".to_string(),
        Gpe => "gpe".to_string(),
        Org => "org".to_string(),
        Event => "event".to_string(),
        Other(s) => s.clone(),
    }
}

#[async_trait]
impl GraphIndex for Neo4jIndex {
    async fn sync_title(&self, record: &Title) -> Result<()> {
        let title_query = Query::new(
            "MERGE (t:Title {id: $id})
             SET t.display_text = $display_text,
                 t.verdict = $verdict,
                 t.published_at = datetime($published_at)"
                .to_string(),
        )
        .param("id", record.id.0.to_string())
        .param("display_text", record.display_text.clone())
        .param("verdict", verdict_str(record))
        .param("published_at", record.published_at.to_rfc3339());

        self.graph
            .run(title_query)
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?;

        // One MERGE per entity, same per-item loop shape as `assign_to_ef`
        // in the Postgres adapter — avoids needing a list-of-maps param.
        for entity in &record.entities {
            let entity_query = Query::new(
                "MATCH (t:Title {id: $id})
                 MERGE (e:Entity {text: $text, entity_type: $entity_type})
                 MERGE (t)-[:HAS_ENTITY]->(e)"
                    .to_string(),
            )
            .param("id", record.id.0.to_string())
            .param("text", entity.text.clone())
            .param("entity_type", entity_type_str(&entity.entity_type));

            self.graph
                .run(entity_query)
                .await
                .map_err(|e| Neo4jError::Query(e.to_string()))?;
        }
        Ok(())
    }

    async fn sync_action_triple(&self, title_id: TitleId, triple: &ActionTriple) -> Result<()> {
        if !triple.is_complete_enough_for_graph() {
            return Ok(());
        }

        if let Some(actor) = &triple.actor {
            let query = Query::new(
                "MATCH (t:Title {id: $id})
                 MERGE (a:Entity {text: $actor, entity_type: 'actor'})
                 MERGE (t)-[:HAS_ACTION {role: 'actor', action: $action}]->(a)"
                    .to_string(),
            )
            .param("id", title_id.0.to_string())
            .param("actor", actor.clone())
            .param("action", triple.action.clone());
            self.graph
                .run(query)
                .await
                .map_err(|e| Neo4jError::Query(e.to_string()))?;
        }

        if let Some(target) = &triple.target {
            let query = Query::new(
                "MATCH (t:Title {id: $id})
                 MERGE (b:Entity {text: $target, entity_type: 'target'})
                 MERGE (t)-[:HAS_ACTION {role: 'target', action: $action}]->(b)"
                    .to_string(),
            )
            .param("id", title_id.0.to_string())
            .param("target", target.clone())
            .param("action", triple.action.clone());
            self.graph
                .run(query)
                .await
                .map_err(|e| Neo4jError::Query(e.to_string()))?;
        }

        Ok(())
    }

    async fn strategic_neighbors(
        &self,
        title_id: TitleId,
        min_shared: u32,
        days: i64,
    ) -> Result<Vec<StrategicNeighbor>> {
        let since = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let query = Query::new(
            "MATCH (t:Title {id: $id})-[:HAS_ENTITY]->(e:Entity)<-[:HAS_ENTITY]-(other:Title)
             WHERE other.id <> $id AND other.verdict = 'strategic'
               AND other.published_at >= datetime($since)
             WITH other, count(DISTINCT e) AS shared
             WHERE shared >= $min_shared
             RETURN other.id AS title_id, shared AS shared_entity_count
             ORDER BY shared DESC
             LIMIT 3"
                .to_string(),
        )
        .param("id", title_id.0.to_string())
        .param("since", since)
        .param("min_shared", i64::from(min_shared));

        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?;

        let mut neighbors = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?
        {
            let id_str: String = row
                .get("title_id")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            let shared: i64 = row
                .get("shared_entity_count")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            let id = id_str
                .parse::<uuid::Uuid>()
                .map_err(|e| PipelineError::GraphUnavailable(format!("bad title id in row: {e}")))?;
            neighbors.push(StrategicNeighbor {
                title_id: TitleId(id),
                shared_entity_count: shared as u32,
            });
        }
        Ok(neighbors)
    }

    async fn entity_centrality(
        &self,
        title_id: TitleId,
        min_strategic_mentions: u32,
        days: i64,
    ) -> Result<Vec<EntityCentrality>> {
        let since = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let query = Query::new(
            "MATCH (t:Title {id: $id})-[:HAS_ENTITY]->(e:Entity)
             MATCH (e)<-[:HAS_ENTITY]-(strat:Title)
             WHERE strat.verdict = 'strategic' AND strat.published_at >= datetime($since)
             WITH e, count(DISTINCT strat) AS mentions
             WHERE mentions >= $min_mentions
             RETURN e.text AS entity_text, mentions AS strategic_mention_count"
                .to_string(),
        )
        .param("id", title_id.0.to_string())
        .param("since", since)
        .param("min_mentions", i64::from(min_strategic_mentions));

        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?
        {
            let entity_text: String = row
                .get("entity_text")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            let mentions: i64 = row
                .get("strategic_mention_count")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            out.push(EntityCentrality {
                entity_text,
                strategic_mention_count: mentions as u32,
            });
        }
        Ok(out)
    }

    async fn strategic_neighborhood(&self, title_id: TitleId, days: i64) -> Result<Neighborhood> {
        let since = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let query = Query::new(
            "MATCH (t:Title {id: $id})-[:HAS_ENTITY]->(e:Entity)
             WITH t, count(e) AS entity_count
             OPTIONAL MATCH (t)-[:HAS_ENTITY]->(:Entity)<-[:HAS_ENTITY]-(other:Title)
             WHERE other.id <> $id AND other.published_at >= datetime($since)
             RETURN entity_count, count(DISTINCT other) AS neighbor_count"
                .to_string(),
        )
        .param("id", title_id.0.to_string())
        .param("since", since);

        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?;

        let Some(row) = result
            .next()
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?
        else {
            return Ok(Neighborhood {
                neighbor_count: 0,
                density: 0.0,
            });
        };

        let entity_count: i64 = row
            .get("entity_count")
            .map_err(|e| Neo4jError::Decode(e.to_string()))?;
        let neighbor_count: i64 = row
            .get("neighbor_count")
            .map_err(|e| Neo4jError::Decode(e.to_string()))?;
        let density = if entity_count > 0 {
            neighbor_count as f64 / entity_count as f64
        } else {
            0.0
        };
        Ok(Neighborhood {
            neighbor_count: neighbor_count as u32,
            density,
        })
    }

    async fn ongoing_event(
        &self,
        title_id: TitleId,
        min_sequence_length: u32,
        days: i64,
    ) -> Result<bool> {
        let since = (Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        let query = Query::new(
            "MATCH (t:Title {id: $id})-[:HAS_ENTITY]->(e:Entity)<-[:HAS_ENTITY]-(strat:Title)
             WHERE strat.verdict = 'strategic' AND strat.published_at >= datetime($since)
             WITH e, count(DISTINCT strat) AS mentions
             RETURN max(mentions) AS max_mentions"
                .to_string(),
        )
        .param("id", title_id.0.to_string())
        .param("since", since);

        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?;

        let Some(row) = result
            .next()
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?
        else {
            return Ok(false);
        };
        let max_mentions: Option<i64> = row
            .get("max_mentions")
            .map_err(|e| Neo4jError::Decode(e.to_string()))?;
        Ok(max_mentions.unwrap_or(0) >= i64::from(min_sequence_length))
    }

    async fn raw_connectivity_pairs(&self, min_shared: u32, limit: usize) -> Result<Vec<RawPair>> {
        let query = Query::new(
            "MATCH (a:Title)-[:HAS_ENTITY]->(e:Entity)<-[:HAS_ENTITY]-(b:Title)
             WHERE a.verdict = 'strategic' AND b.verdict = 'strategic' AND a.id < b.id
             WITH a, b, count(DISTINCT e) AS shared
             WHERE shared >= $min_shared
             RETURN a.id AS title_a, b.id AS title_b, shared AS shared_entity_count
             ORDER BY shared DESC
             LIMIT $limit"
                .to_string(),
        )
        .param("min_shared", i64::from(min_shared))
        .param("limit", limit as i64);

        let mut result = self
            .graph
            .execute(query)
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?;

        let mut pairs = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Neo4jError::Query(e.to_string()))?
        {
            let a_str: String = row
                .get("title_a")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            let b_str: String = row
                .get("title_b")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            let shared: i64 = row
                .get("shared_entity_count")
                .map_err(|e| Neo4jError::Decode(e.to_string()))?;
            let a = a_str
                .parse::<uuid::Uuid>()
                .map_err(|e| PipelineError::GraphUnavailable(format!("bad title_a in row: {e}")))?;
            let b = b_str
                .parse::<uuid::Uuid>()
                .map_err(|e| PipelineError::GraphUnavailable(format!("bad title_b in row: {e}")))?;
            pairs.push(RawPair {
                title_a: TitleId(a),
                title_b: TitleId(b),
                shared_entity_count: shared as u32,
            });
        }
        Ok(pairs)
    }
}
