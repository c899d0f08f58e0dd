//! C3's storage half: `title_connectivity_cache` (spec §4.3).

use arcline_core::domain::{ConnectivityRecord, TitleId};
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::ConnectivityStore;
use async_trait::async_trait;
use tokio_postgres::Row;

use crate::PgStore;

fn row_to_record(row: &Row) -> ConnectivityRecord {
    let title_a: uuid::Uuid = row.get("title_a");
    let title_b: uuid::Uuid = row.get("title_b");
    let shared_actor: Option<i32> = row.get("shared_actor");
    ConnectivityRecord {
        title_a: TitleId(title_a),
        title_b: TitleId(title_b),
        entity_jaccard: row.get("entity_jaccard"),
        actor_match: row.get("actor_match"),
        composite: row.get("composite"),
        shared_actor: shared_actor.map(|v| v as usize),
    }
}

#[async_trait]
impl ConnectivityStore for PgStore {
    async fn replace_all(&self, records: Vec<ConnectivityRecord>) -> Result<()> {
        let mut guard = self.client.lock().await;
        let client = guard
            .transaction()
            .await
            .map_err(|e| PipelineError::GraphUnavailable(format!("starting cache refresh tx: {e}")))?;

        client
            .execute("TRUNCATE TABLE title_connectivity_cache", &[])
            .await
            .map_err(|e| PipelineError::GraphUnavailable(format!("truncating cache: {e}")))?;

        for chunk in records.chunks(500) {
            for record in chunk {
                let shared_actor = record.shared_actor.map(|v| v as i32);
                client
                    .execute(
                        "INSERT INTO title_connectivity_cache
                            (title_a, title_b, entity_jaccard, actor_match, composite, shared_actor)
                         VALUES ($1,$2,$3,$4,$5,$6)",
                        &[
                            &record.title_a.0,
                            &record.title_b.0,
                            &record.entity_jaccard,
                            &record.actor_match,
                            &record.composite,
                            &shared_actor,
                        ],
                    )
                    .await
                    .map_err(|e| {
                        PipelineError::GraphUnavailable(format!("inserting cache row: {e}"))
                    })?;
            }
        }

        client
            .commit()
            .await
            .map_err(|e| PipelineError::GraphUnavailable(format!("committing cache refresh: {e}")))?;
        Ok(())
    }

    async fn get_pair(&self, a: TitleId, b: TitleId) -> Result<Option<ConnectivityRecord>> {
        let (lo, hi) = if a.0 <= b.0 { (a, b) } else { (b, a) };
        let rows = self
            .client
            .lock()
            .await
            .query(
                "SELECT * FROM title_connectivity_cache WHERE title_a = $1 AND title_b = $2",
                &[&lo.0, &hi.0],
            )
            .await
            .map_err(|e| PipelineError::Transient(format!("loading connectivity pair: {e}")))?;
        Ok(rows.first().map(row_to_record))
    }

    async fn count(&self) -> Result<usize> {
        let row = self
            .client
            .lock()
            .await
            .query_one("SELECT COUNT(*) FROM title_connectivity_cache", &[])
            .await
            .map_err(|e| PipelineError::Transient(format!("counting connectivity cache: {e}")))?;
        let count: i64 = row.get(0);
        Ok(count as usize)
    }
}
