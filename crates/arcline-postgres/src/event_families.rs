//! C1's EF half: `event_families` table (spec §4.5, §4.6).

use arcline_core::domain::{
    CtmId, EfContext, EfStatus, EnrichmentPayload, EventFamily, EventFamilyId, TitleId,
};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::EventFamilyStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::PgStore;

fn status_to_str(s: EfStatus) -> &'static str {
    match s {
        EfStatus::Seed => "seed",
        EfStatus::Active => "active",
    }
}

fn str_to_status(s: &str) -> Result<EfStatus> {
    match s {
        "seed" => Ok(EfStatus::Seed),
        "active" => Ok(EfStatus::Active),
        other => Err(PipelineError::FatalConfig(format!(
            "unknown EF status in row: {other}"
        ))),
    }
}

fn row_to_ef(row: &Row) -> Result<EventFamily> {
    let id: Uuid = row.get("id");
    let key_actors: serde_json::Value = row.get("key_actors");
    let source_title_ids: serde_json::Value = row.get("source_title_ids");
    let tags: serde_json::Value = row.get("tags");
    let context: serde_json::Value = row.get("context");
    let enrichment: Option<serde_json::Value> = row.get("enrichment");
    let ctm_centroid_id: Option<String> = row.get("ctm_centroid_id");
    let ctm_track: Option<String> = row.get("ctm_track");
    let ctm_month: Option<NaiveDate> = row.get("ctm_month");

    let key_actors: Vec<String> = serde_json::from_value(key_actors)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding key_actors: {e}")))?;
    let source_title_ids_raw: Vec<Uuid> = serde_json::from_value(source_title_ids)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding source_title_ids: {e}")))?;
    let tags: Vec<String> = serde_json::from_value(tags)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding tags: {e}")))?;
    let context: EfContext = serde_json::from_value(context)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding context: {e}")))?;
    let enrichment: Option<EnrichmentPayload> = enrichment
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| PipelineError::FatalConfig(format!("decoding enrichment: {e}")))?;

    let ctm_id = match (ctm_centroid_id, ctm_track, ctm_month) {
        (Some(centroid_id), Some(track), Some(month)) => Some(CtmId {
            centroid_id,
            track,
            month,
        }),
        _ => None,
    };

    Ok(EventFamily {
        id: EventFamilyId(id),
        title: row.get("title"),
        summary: row.get("summary"),
        key_actors,
        event_type: row.get("event_type"),
        primary_theater: row.get("primary_theater"),
        event_start: row.get("event_start"),
        event_end: row.get("event_end"),
        source_title_ids: source_title_ids_raw.into_iter().map(TitleId).collect(),
        confidence: row.get("confidence"),
        coherence_rationale: row.get("coherence_rationale"),
        status: str_to_status(row.get("status"))?,
        tags,
        context,
        enrichment,
        ctm_id,
    })
}

#[async_trait]
impl EventFamilyStore for PgStore {
    async fn create_ef(&self, ef: &EventFamily) -> Result<()> {
        self.update_ef(ef).await
    }

    async fn get_ef(&self, id: EventFamilyId) -> Result<Option<EventFamily>> {
        let rows = self
            .client
            .lock()
            .await
            .query("SELECT * FROM event_families WHERE id = $1", &[&id.0])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading event family: {e}")))?;
        rows.first().map(row_to_ef).transpose()
    }

    async fn update_ef(&self, ef: &EventFamily) -> Result<()> {
        if !ef.satisfies_active_cardinality_bounds() {
            return Err(PipelineError::Validation(format!(
                "EF {} does not satisfy active cardinality bounds",
                ef.id
            )));
        }

        let key_actors_json = serde_json::to_value(&ef.key_actors)
            .map_err(|e| PipelineError::Transient(format!("encoding key_actors: {e}")))?;
        let source_title_ids_raw: Vec<Uuid> = ef.source_title_ids.iter().map(|t| t.0).collect();
        let source_title_ids_json = serde_json::to_value(&source_title_ids_raw)
            .map_err(|e| PipelineError::Transient(format!("encoding source_title_ids: {e}")))?;
        let tags_json = serde_json::to_value(&ef.tags)
            .map_err(|e| PipelineError::Transient(format!("encoding tags: {e}")))?;
        let context_json = serde_json::to_value(&ef.context)
            .map_err(|e| PipelineError::Transient(format!("encoding context: {e}")))?;
        let enrichment_json = ef
            .enrichment
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| PipelineError::Transient(format!("encoding enrichment: {e}")))?;
        let (ctm_centroid_id, ctm_track, ctm_month) = match &ef.ctm_id {
            Some(ctm) => (
                Some(ctm.centroid_id.clone()),
                Some(ctm.track.clone()),
                Some(ctm.month),
            ),
            None => (None, None, None),
        };

        self.client
            .lock()
            .await
            .execute(
                "INSERT INTO event_families (id, title, summary, key_actors, event_type,
                    primary_theater, event_start, event_end, source_title_ids, confidence,
                    coherence_rationale, status, tags, context, enrichment,
                    ctm_centroid_id, ctm_track, ctm_month)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18)
                 ON CONFLICT (id) DO UPDATE SET
                    title = EXCLUDED.title,
                    summary = EXCLUDED.summary,
                    key_actors = EXCLUDED.key_actors,
                    event_type = EXCLUDED.event_type,
                    primary_theater = EXCLUDED.primary_theater,
                    event_start = EXCLUDED.event_start,
                    event_end = EXCLUDED.event_end,
                    source_title_ids = EXCLUDED.source_title_ids,
                    confidence = EXCLUDED.confidence,
                    coherence_rationale = EXCLUDED.coherence_rationale,
                    status = EXCLUDED.status,
                    tags = EXCLUDED.tags,
                    context = EXCLUDED.context,
                    enrichment = EXCLUDED.enrichment,
                    ctm_centroid_id = EXCLUDED.ctm_centroid_id,
                    ctm_track = EXCLUDED.ctm_track,
                    ctm_month = EXCLUDED.ctm_month",
                &[
                    &ef.id.0,
                    &ef.title,
                    &ef.summary,
                    &key_actors_json,
                    &ef.event_type,
                    &ef.primary_theater,
                    &ef.event_start,
                    &ef.event_end,
                    &source_title_ids_json,
                    &ef.confidence,
                    &ef.coherence_rationale,
                    &status_to_str(ef.status),
                    &tags_json,
                    &context_json,
                    &enrichment_json,
                    &ctm_centroid_id,
                    &ctm_track,
                    &ctm_month,
                ],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("upserting event family: {e}")))?;
        Ok(())
    }

    async fn load_seed_efs(&self, limit: usize) -> Result<Vec<EventFamily>> {
        let rows = self
            .client
            .lock()
            .await
            .query(
                "SELECT * FROM event_families WHERE status = 'seed' LIMIT $1",
                &[&(limit as i64)],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("loading seed EFs: {e}")))?;
        rows.iter().map(row_to_ef).collect()
    }

    async fn load_active_efs_for_month(&self, month: NaiveDate) -> Result<Vec<EventFamily>> {
        let rows = self
            .client
            .lock()
            .await
            .query(
                "SELECT * FROM event_families WHERE status = 'active' AND ctm_month = $1",
                &[&month],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("loading active EFs for month: {e}")))?;
        rows.iter().map(row_to_ef).collect()
    }
}
