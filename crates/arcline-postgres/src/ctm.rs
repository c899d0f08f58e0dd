//! CTM bucket storage (spec §3, §4.8).

use arcline_core::domain::{Ctm, CtmId};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::CtmStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

use crate::PgStore;

fn row_to_ctm(row: &Row) -> Ctm {
    Ctm {
        id: CtmId {
            centroid_id: row.get("centroid_id"),
            track: row.get("track"),
            month: row.get("month"),
        },
        title_count: row.get::<_, i32>("title_count") as u32,
        is_frozen: row.get("is_frozen"),
        summary_text: row.get("summary_text"),
        event_count_at_summary: row
            .get::<_, Option<i32>>("event_count_at_summary")
            .map(|v| v as u32),
        last_summary_at: row.get("last_summary_at"),
    }
}

#[async_trait]
impl CtmStore for PgStore {
    async fn get(&self, id: &CtmId) -> Result<Option<Ctm>> {
        let rows = self
            .client
            .lock()
            .await
            .query(
                "SELECT * FROM ctm WHERE centroid_id = $1 AND track = $2 AND month = $3",
                &[&id.centroid_id, &id.track, &id.month],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("loading CTM: {e}")))?;
        Ok(rows.first().map(row_to_ctm))
    }

    async fn upsert(&self, ctm: &Ctm) -> Result<()> {
        self.client
            .lock()
            .await
            .execute(
                "INSERT INTO ctm (centroid_id, track, month, title_count, is_frozen,
                    summary_text, event_count_at_summary, last_summary_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                 ON CONFLICT (centroid_id, track, month) DO UPDATE SET
                    title_count = EXCLUDED.title_count,
                    is_frozen = EXCLUDED.is_frozen,
                    summary_text = EXCLUDED.summary_text,
                    event_count_at_summary = EXCLUDED.event_count_at_summary,
                    last_summary_at = EXCLUDED.last_summary_at",
                &[
                    &ctm.id.centroid_id,
                    &ctm.id.track,
                    &ctm.id.month,
                    &(ctm.title_count as i32),
                    &ctm.is_frozen,
                    &ctm.summary_text,
                    &ctm.event_count_at_summary.map(|v| v as i32),
                    &ctm.last_summary_at,
                ],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("upserting CTM: {e}")))?;
        Ok(())
    }

    async fn load_unfrozen(&self) -> Result<Vec<Ctm>> {
        let rows = self
            .client
            .lock()
            .await
            .query("SELECT * FROM ctm WHERE is_frozen = FALSE", &[])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading unfrozen CTMs: {e}")))?;
        Ok(rows.iter().map(row_to_ctm).collect())
    }

    async fn record_summary(
        &self,
        id: &CtmId,
        summary_text: String,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let rows = self
            .client
            .lock()
            .await
            .execute(
                "UPDATE ctm SET summary_text = $4, last_summary_at = $5,
                    event_count_at_summary = title_count
                 WHERE centroid_id = $1 AND track = $2 AND month = $3",
                &[&id.centroid_id, &id.track, &id.month, &summary_text, &at],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("recording CTM summary: {e}")))?;
        if rows == 0 {
            return Err(PipelineError::Validation(format!(
                "record_summary: no CTM bucket {}/{}/{}",
                id.centroid_id, id.track, id.month
            )));
        }
        Ok(())
    }
}
