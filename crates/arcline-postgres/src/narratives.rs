//! Narrative frame storage, exclusively owned by C8 (spec §3, §4.8).

use arcline_core::domain::{NarrativeEntityType, NarrativeFrame};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::NarrativeStore;
use async_trait::async_trait;
use tokio_postgres::Row;

use crate::PgStore;

fn entity_type_to_str(t: NarrativeEntityType) -> &'static str {
    match t {
        NarrativeEntityType::Event => "event",
        NarrativeEntityType::Ctm => "ctm",
        NarrativeEntityType::Epic => "epic",
    }
}

fn str_to_entity_type(s: &str) -> Result<NarrativeEntityType> {
    match s {
        "event" => Ok(NarrativeEntityType::Event),
        "ctm" => Ok(NarrativeEntityType::Ctm),
        "epic" => Ok(NarrativeEntityType::Epic),
        other => Err(PipelineError::FatalConfig(format!(
            "unknown narrative entity_type in row: {other}"
        ))),
    }
}

fn row_to_frame(row: &Row) -> Result<NarrativeFrame> {
    let top_sources: serde_json::Value = row.get("top_sources");
    let proportional_sources: serde_json::Value = row.get("proportional_sources");
    let top_countries: serde_json::Value = row.get("top_countries");
    let sample_titles: serde_json::Value = row.get("sample_titles");
    let sample_title_ids: Vec<uuid::Uuid> = serde_json::from_value(sample_titles)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding sample_titles: {e}")))?;

    Ok(NarrativeFrame {
        entity_type: str_to_entity_type(row.get("entity_type"))?,
        entity_id: row.get("entity_id"),
        label: row.get("label"),
        description: row.get("description"),
        moral_frame: row.get("moral_frame"),
        title_count: row.get::<_, i32>("title_count") as u32,
        top_sources: serde_json::from_value(top_sources)
            .map_err(|e| PipelineError::FatalConfig(format!("decoding top_sources: {e}")))?,
        proportional_sources: serde_json::from_value(proportional_sources).map_err(|e| {
            PipelineError::FatalConfig(format!("decoding proportional_sources: {e}"))
        })?,
        top_countries: serde_json::from_value(top_countries)
            .map_err(|e| PipelineError::FatalConfig(format!("decoding top_countries: {e}")))?,
        sample_titles: sample_title_ids
            .into_iter()
            .map(arcline_core::domain::TitleId)
            .collect(),
    })
}

#[async_trait]
impl NarrativeStore for PgStore {
    async fn replace_frames(
        &self,
        entity_type: NarrativeEntityType,
        entity_id: &str,
        frames: Vec<NarrativeFrame>,
    ) -> Result<()> {
        let mut guard = self.client.lock().await;
        let tx = guard
            .transaction()
            .await
            .map_err(|e| PipelineError::Transient(format!("starting frame refresh tx: {e}")))?;

        tx.execute(
            "DELETE FROM narratives WHERE entity_type = $1 AND entity_id = $2",
            &[&entity_type_to_str(entity_type), &entity_id],
        )
        .await
        .map_err(|e| PipelineError::Transient(format!("clearing old frames: {e}")))?;

        for frame in &frames {
            let sample_title_ids: Vec<uuid::Uuid> =
                frame.sample_titles.iter().map(|t| t.0).collect();
            let top_sources_json = serde_json::to_value(&frame.top_sources)
                .map_err(|e| PipelineError::Transient(format!("encoding top_sources: {e}")))?;
            let proportional_sources_json = serde_json::to_value(&frame.proportional_sources)
                .map_err(|e| {
                    PipelineError::Transient(format!("encoding proportional_sources: {e}"))
                })?;
            let top_countries_json = serde_json::to_value(&frame.top_countries)
                .map_err(|e| PipelineError::Transient(format!("encoding top_countries: {e}")))?;
            let sample_titles_json = serde_json::to_value(&sample_title_ids)
                .map_err(|e| PipelineError::Transient(format!("encoding sample_titles: {e}")))?;

            tx.execute(
                "INSERT INTO narratives (entity_type, entity_id, label, description,
                    moral_frame, title_count, top_sources, proportional_sources,
                    top_countries, sample_titles)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
                &[
                    &entity_type_to_str(frame.entity_type),
                    &frame.entity_id,
                    &frame.label,
                    &frame.description,
                    &frame.moral_frame,
                    &(frame.title_count as i32),
                    &top_sources_json,
                    &proportional_sources_json,
                    &top_countries_json,
                    &sample_titles_json,
                ],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("inserting frame: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| PipelineError::Transient(format!("committing frame refresh: {e}")))?;
        Ok(())
    }

    async fn load_frames(
        &self,
        entity_type: NarrativeEntityType,
        entity_id: &str,
    ) -> Result<Vec<NarrativeFrame>> {
        let rows = self
            .client
            .lock()
            .await
            .query(
                "SELECT * FROM narratives WHERE entity_type = $1 AND entity_id = $2",
                &[&entity_type_to_str(entity_type), &entity_id],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("loading frames: {e}")))?;
        rows.iter().map(row_to_frame).collect()
    }
}
