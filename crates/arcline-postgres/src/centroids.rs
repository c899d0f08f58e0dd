//! Centroid configuration storage (spec §3, §4.7).

use arcline_core::domain::Centroid;
use arcline_core::error::{PipelineError, Result};
use arcline_core::traits::CentroidStore;
use async_trait::async_trait;
use tokio_postgres::Row;

use crate::PgStore;

fn row_to_centroid(row: &Row) -> Result<Centroid> {
    let keywords: serde_json::Value = row.get("keywords");
    let actors: serde_json::Value = row.get("actors");
    let theaters: serde_json::Value = row.get("theaters");

    Ok(Centroid {
        id: row.get("id"),
        label: row.get("label"),
        keywords: serde_json::from_value(keywords)
            .map_err(|e| PipelineError::FatalConfig(format!("decoding keywords: {e}")))?,
        actors: serde_json::from_value(actors)
            .map_err(|e| PipelineError::FatalConfig(format!("decoding actors: {e}")))?,
        theaters: serde_json::from_value(theaters)
            .map_err(|e| PipelineError::FatalConfig(format!("decoding theaters: {e}")))?,
    })
}

#[async_trait]
impl CentroidStore for PgStore {
    async fn load_all(&self) -> Result<Vec<Centroid>> {
        let rows = self
            .client
            .lock()
            .await
            .query("SELECT * FROM centroids ORDER BY id", &[])
            .await
            .map_err(|e| PipelineError::Transient(format!("loading centroids: {e}")))?;
        rows.iter().map(row_to_centroid).collect()
    }
}
