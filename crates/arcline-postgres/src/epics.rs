//! Epic storage (SPEC_FULL §3/§4.11).

use arcline_core::domain::{Epic, EpicId, EventFamilyId};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::EpicStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::PgStore;

fn row_to_epic(row: &Row) -> Result<Epic> {
    let id: Uuid = row.get("id");
    let bridge_tags: serde_json::Value = row.get("bridge_tags");
    let member_ef_ids: serde_json::Value = row.get("member_ef_ids");
    let member_ef_ids_raw: Vec<Uuid> = serde_json::from_value(member_ef_ids)
        .map_err(|e| PipelineError::FatalConfig(format!("decoding member_ef_ids: {e}")))?;

    Ok(Epic {
        id: EpicId(id),
        month: row.get("month"),
        bridge_tags: serde_json::from_value(bridge_tags)
            .map_err(|e| PipelineError::FatalConfig(format!("decoding bridge_tags: {e}")))?,
        member_ef_ids: member_ef_ids_raw.into_iter().map(EventFamilyId).collect(),
        centroid_count: row.get::<_, i32>("centroid_count") as u32,
        title: row.get("title"),
        summary: row.get("summary"),
    })
}

#[async_trait]
impl EpicStore for PgStore {
    async fn create(&self, epic: &Epic) -> Result<()> {
        let bridge_tags_json = serde_json::to_value(&epic.bridge_tags)
            .map_err(|e| PipelineError::Transient(format!("encoding bridge_tags: {e}")))?;
        let member_ef_ids_raw: Vec<Uuid> = epic.member_ef_ids.iter().map(|e| e.0).collect();
        let member_ef_ids_json = serde_json::to_value(&member_ef_ids_raw)
            .map_err(|e| PipelineError::Transient(format!("encoding member_ef_ids: {e}")))?;

        self.client
            .lock()
            .await
            .execute(
                "INSERT INTO epics (id, month, bridge_tags, member_ef_ids, centroid_count,
                    title, summary)
                 VALUES ($1,$2,$3,$4,$5,$6,$7)
                 ON CONFLICT (id) DO UPDATE SET
                    month = EXCLUDED.month,
                    bridge_tags = EXCLUDED.bridge_tags,
                    member_ef_ids = EXCLUDED.member_ef_ids,
                    centroid_count = EXCLUDED.centroid_count,
                    title = EXCLUDED.title,
                    summary = EXCLUDED.summary",
                &[
                    &epic.id.0,
                    &epic.month,
                    &bridge_tags_json,
                    &member_ef_ids_json,
                    &(epic.centroid_count as i32),
                    &epic.title,
                    &epic.summary,
                ],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("inserting epic: {e}")))?;
        Ok(())
    }

    async fn load_for_month(&self, month: NaiveDate) -> Result<Vec<Epic>> {
        let rows = self
            .client
            .lock()
            .await
            .query("SELECT * FROM epics WHERE month = $1", &[&month])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading epics for month: {e}")))?;
        rows.iter().map(row_to_epic).collect()
    }
}
