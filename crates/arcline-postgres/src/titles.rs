//! C1: `titles` table (spec §4.1, §6).

use arcline_core::domain::{
    ActionTriple, EfAssignment, Entity, EventFamilyId, Title, TitleId, Verdict,
};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::{SortOrder, TitleStore};
use async_trait::async_trait;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::PgStore;

fn verdict_to_str(v: Verdict) -> &'static str {
    match v {
        Verdict::Unfiltered => "unfiltered",
        Verdict::Strategic => "strategic",
        Verdict::NonStrategic => "non_strategic",
    }
}

fn str_to_verdict(s: &str) -> Result<Verdict> {
    match s {
        "unfiltered" => Ok(Verdict::Unfiltered),
        "strategic" => Ok(Verdict::Strategic),
        "non_strategic" => Ok(Verdict::NonStrategic),
        other => Err(PipelineError::FatalConfig(format!(
            "unknown verdict in titles row: {other}"
        ))),
    }
}

fn status_to_str(s: arcline_core::domain::ProcessingStatus) -> &'static str {
    use arcline_core::domain::ProcessingStatus::*;
    match s {
        Pending => "pending",
        Filtered => "filtered",
        Assigned => "assigned",
        Failed => "failed",
    }
}

fn str_to_status(s: &str) -> Result<arcline_core::domain::ProcessingStatus> {
    use arcline_core::domain::ProcessingStatus::*;
    match s {
        "pending" => Ok(Pending),
        "filtered" => Ok(Filtered),
        "assigned" => Ok(Assigned),
        "failed" => Ok(Failed),
        other => Err(PipelineError::FatalConfig(format!(
            "unknown processing status in titles row: {other}"
        ))),
    }
}

fn row_to_title(row: &Row) -> Result<Title> {
    let id: Uuid = row.get("id");
    let entities_json: serde_json::Value = row.get("entities");
    let actors_json: serde_json::Value = row.get("actors");
    let action_triple_json: Option<serde_json::Value> = row.get("action_triple");
    let ef_id: Option<Uuid> = row.get("ef_id");
    let ef_confidence: Option<f64> = row.get("ef_confidence");
    let ef_rationale: Option<String> = row.get("ef_rationale");

    let entities: Vec<Entity> = serde_json::from_value(entities_json)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding entities: {e}")))?;
    let actors: Vec<String> = serde_json::from_value(actors_json)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding actors: {e}")))?;
    let action_triple: Option<ActionTriple> = action_triple_json
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| PipelineError::FatalConfig(format!("decoding action_triple: {e}")))?;

    let ef_assignment = ef_id.map(|ef_id| EfAssignment {
        ef_id: EventFamilyId(ef_id),
        confidence: ef_confidence.unwrap_or(0.0),
        rationale: ef_rationale.unwrap_or_default(),
    });

    Ok(Title {
        id: TitleId(id),
        display_text: row.get("display_text"),
        normalized_text: row.get("normalized_text"),
        publisher: row.get("publisher"),
        published_at: row.get("published_at"),
        language: row.get("language"),
        iso_country: row.get("iso_country"),
        verdict: str_to_verdict(row.get("verdict"))?,
        verdict_reason: row.get("verdict_reason"),
        actors,
        entities,
        action_triple,
        ef_assignment,
        status: str_to_status(row.get("status"))?,
    })
}

#[async_trait]
impl TitleStore for PgStore {
    async fn upsert_title(&self, record: &Title) -> Result<()> {
        let existing = self.get_title(record.id).await?;
        if let Some(prev) = &existing {
            if !prev.entities.is_empty() && prev.entities != record.entities {
                return Err(PipelineError::InvariantViolation(format!(
                    "title {} already has entities set; re-extraction requires a reset",
                    record.id
                )));
            }
            if prev.action_triple.is_some() && prev.action_triple != record.action_triple {
                return Err(PipelineError::InvariantViolation(format!(
                    "title {} already has an action triple set; re-extraction requires a reset",
                    record.id
                )));
            }
        }

        let entities_json = serde_json::to_value(&record.entities)
            .map_err(|e| PipelineError::Transient(format!("encoding entities: {e}")))?;
        let actors_json = serde_json::to_value(&record.actors)
            .map_err(|e| PipelineError::Transient(format!("encoding actors: {e}")))?;
        let action_triple_json = record
            .action_triple
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| PipelineError::Transient(format!("encoding action_triple: {e}")))?;
        let (ef_id, ef_confidence, ef_rationale) = match &record.ef_assignment {
            Some(a) => (Some(a.ef_id.0), Some(a.confidence), Some(a.rationale.clone())),
            None => (None, None, None),
        };

        self.client
            .lock()
            .await
            .execute(
                "INSERT INTO titles (id, display_text, normalized_text, publisher, published_at,
                    language, iso_country, verdict, verdict_reason, actors, entities,
                    action_triple, ef_id, ef_confidence, ef_rationale, status)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
                 ON CONFLICT (id) DO UPDATE SET
                    display_text = EXCLUDED.display_text,
                    normalized_text = EXCLUDED.normalized_text,
                    publisher = EXCLUDED.publisher,
                    published_at = EXCLUDED.published_at,
                    language = EXCLUDED.language,
                    iso_country = EXCLUDED.iso_country,
                    verdict = EXCLUDED.verdict,
                    verdict_reason = EXCLUDED.verdict_reason,
                    actors = EXCLUDED.actors,
                    entities = EXCLUDED.entities,
                    action_triple = EXCLUDED.action_triple,
                    ef_id = EXCLUDED.ef_id,
                    ef_confidence = EXCLUDED.ef_confidence,
                    ef_rationale = EXCLUDED.ef_rationale,
                    status = EXCLUDED.status",
                &[
                    &record.id.0,
                    &record.display_text,
                    &record.normalized_text,
                    &record.publisher,
                    &record.published_at,
                    &record.language,
                    &record.iso_country,
                    &verdict_to_str(record.verdict),
                    &record.verdict_reason,
                    &actors_json,
                    &entities_json,
                    &action_triple_json,
                    &ef_id,
                    &ef_confidence,
                    &ef_rationale,
                    &status_to_str(record.status),
                ],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("upserting title: {e}")))?;
        Ok(())
    }

    async fn mark_verdict(
        &self,
        id: TitleId,
        verdict: Verdict,
        reason: &str,
        entities: Vec<Entity>,
        triple: Option<ActionTriple>,
    ) -> Result<()> {
        let current = self.get_title(id).await?.ok_or_else(|| {
            PipelineError::Validation(format!("mark_verdict: title {id} not found"))
        })?;
        if current.verdict != Verdict::Unfiltered {
            return Err(PipelineError::InvariantViolation(format!(
                "title {id} already has verdict {:?}, P2 may only run once",
                current.verdict
            )));
        }

        let entities_json = serde_json::to_value(&entities)
            .map_err(|e| PipelineError::Transient(format!("encoding entities: {e}")))?;
        let triple_json = triple
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| PipelineError::Transient(format!("encoding action_triple: {e}")))?;
        self.client
            .lock()
            .await
            .execute(
                "UPDATE titles SET verdict = $2, verdict_reason = $3, entities = $4,
                    action_triple = $5, status = 'filtered'
                 WHERE id = $1",
                &[
                    &id.0,
                    &verdict_to_str(verdict),
                    &reason,
                    &entities_json,
                    &triple_json,
                ],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("marking verdict: {e}")))?;
        Ok(())
    }

    async fn assign_to_ef(
        &self,
        ids: &[TitleId],
        ef_id: EventFamilyId,
        confidence: f64,
        rationale: &str,
    ) -> Result<usize> {
        let mut assigned = 0usize;
        for id in ids {
            let rows = self
                .client
                .lock()
                .await
                .execute(
                    "UPDATE titles SET ef_id = $2, ef_confidence = $3, ef_rationale = $4,
                        status = 'assigned'
                     WHERE id = $1 AND ef_id IS NULL",
                    &[&id.0, &ef_id.0, &confidence, &rationale],
                )
                .await
                .map_err(|e| PipelineError::Transient(format!("assigning title to EF: {e}")))?;
            if rows == 0 {
                tracing::warn!(title = %id, "title already has an EF assignment, skipping");
            } else {
                assigned += 1;
            }
        }
        Ok(assigned)
    }

    async fn load_unassigned_strategic(
        &self,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<Title>> {
        let direction = match order {
            SortOrder::PublicationDescending => "DESC",
            SortOrder::PublicationAscending => "ASC",
        };
        let sql = format!(
            "SELECT * FROM titles WHERE verdict = 'strategic' AND ef_id IS NULL
             ORDER BY published_at {direction} LIMIT $1"
        );
        let rows = self
            .client
            .lock()
            .await
            .query(&sql, &[&(limit as i64)])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading unassigned strategic titles: {e}")))?;
        rows.iter().map(row_to_title).collect()
    }

    async fn load_unfiltered(&self, limit: usize) -> Result<Vec<Title>> {
        let rows = self
            .client
            .lock()
            .await
            .query(
                "SELECT * FROM titles WHERE verdict = 'unfiltered'
                 ORDER BY published_at ASC LIMIT $1",
                &[&(limit as i64)],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("loading unfiltered titles: {e}")))?;
        rows.iter().map(row_to_title).collect()
    }

    async fn get_title(&self, id: TitleId) -> Result<Option<Title>> {
        let rows = self
            .client
            .lock()
            .await
            .query("SELECT * FROM titles WHERE id = $1", &[&id.0])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading title: {e}")))?;
        rows.first().map(row_to_title).transpose()
    }

    async fn get_titles(&self, ids: &[TitleId]) -> Result<Vec<Title>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw_ids: Vec<Uuid> = ids.iter().map(|t| t.0).collect();
        let rows = self
            .client
            .lock()
            .await
            .query("SELECT * FROM titles WHERE id = ANY($1)", &[&raw_ids])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading titles: {e}")))?;
        rows.iter().map(row_to_title).collect()
    }
}
