//! PostgreSQL-backed implementations of every `arcline-core` storage port
//! (spec §6: titles, event_families, title_connectivity_cache, centroids,
//! ctm, narratives, epics). Grounded in
//! `dashflow-postgres-checkpointer::PostgresCheckpointer`'s connection
//! management, schema-init-on-connect, and leaf-error-converts-at-the-
//! boundary idioms.
//!
//! Complex nested fields (entities, tags, enrichment context, source
//! share lists, ...) are stored as `JSONB`; scalar fields that drive a
//! `WHERE`/`ORDER BY` clause get their own typed column. Every table name
//! is a compile-time constant — no caller-supplied identifiers reach a
//! format string, since this crate has a fixed, known schema rather than
//! a configurable table name per deployment.

mod centroids;
mod connectivity;
mod ctm;
mod epics;
mod event_families;
mod narratives;
mod titles;

pub mod error;

pub use error::PostgresError;

use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS titles (
    id UUID PRIMARY KEY,
    display_text TEXT NOT NULL,
    normalized_text TEXT NOT NULL,
    publisher TEXT NOT NULL,
    published_at TIMESTAMPTZ NOT NULL,
    language TEXT NOT NULL,
    iso_country TEXT,
    verdict TEXT NOT NULL,
    verdict_reason TEXT,
    actors JSONB NOT NULL DEFAULT '[]',
    entities JSONB NOT NULL DEFAULT '[]',
    action_triple JSONB,
    ef_id UUID,
    ef_confidence DOUBLE PRECISION,
    ef_rationale TEXT,
    status TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_titles_verdict_status ON titles (verdict, status);
CREATE INDEX IF NOT EXISTS idx_titles_published_at ON titles (published_at);

CREATE TABLE IF NOT EXISTS event_families (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    key_actors JSONB NOT NULL DEFAULT '[]',
    event_type TEXT NOT NULL,
    primary_theater TEXT NOT NULL,
    event_start TIMESTAMPTZ NOT NULL,
    event_end TIMESTAMPTZ,
    source_title_ids JSONB NOT NULL DEFAULT '[]',
    confidence DOUBLE PRECISION NOT NULL,
    coherence_rationale TEXT NOT NULL,
    status TEXT NOT NULL,
    tags JSONB NOT NULL DEFAULT '[]',
    context JSONB NOT NULL DEFAULT '{}',
    enrichment JSONB,
    ctm_centroid_id TEXT,
    ctm_track TEXT,
    ctm_month DATE
);
CREATE INDEX IF NOT EXISTS idx_event_families_status ON event_families (status);
CREATE INDEX IF NOT EXISTS idx_event_families_ctm ON event_families (ctm_centroid_id, ctm_track, ctm_month);

CREATE TABLE IF NOT EXISTS title_connectivity_cache (
    title_a UUID NOT NULL,
    title_b UUID NOT NULL,
    entity_jaccard DOUBLE PRECISION NOT NULL,
    actor_match DOUBLE PRECISION NOT NULL,
    composite DOUBLE PRECISION NOT NULL,
    shared_actor INT,
    PRIMARY KEY (title_a, title_b),
    CONSTRAINT ordered_pair CHECK (title_a < title_b)
);

CREATE TABLE IF NOT EXISTS centroids (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    keywords JSONB NOT NULL DEFAULT '[]',
    actors JSONB NOT NULL DEFAULT '[]',
    theaters JSONB NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS ctm (
    centroid_id TEXT NOT NULL,
    track TEXT NOT NULL,
    month DATE NOT NULL,
    title_count INT NOT NULL DEFAULT 0,
    is_frozen BOOLEAN NOT NULL DEFAULT FALSE,
    summary_text TEXT,
    event_count_at_summary INT,
    last_summary_at TIMESTAMPTZ,
    PRIMARY KEY (centroid_id, track, month)
);

CREATE TABLE IF NOT EXISTS narratives (
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    label TEXT NOT NULL,
    description TEXT NOT NULL,
    moral_frame TEXT NOT NULL,
    title_count INT NOT NULL,
    top_sources JSONB NOT NULL DEFAULT '[]',
    proportional_sources JSONB NOT NULL DEFAULT '[]',
    top_countries JSONB NOT NULL DEFAULT '[]',
    sample_titles JSONB NOT NULL DEFAULT '[]',
    PRIMARY KEY (entity_type, entity_id, label)
);

CREATE TABLE IF NOT EXISTS epics (
    id UUID PRIMARY KEY,
    month DATE NOT NULL,
    bridge_tags JSONB NOT NULL DEFAULT '[]',
    member_ef_ids JSONB NOT NULL DEFAULT '[]',
    centroid_count INT NOT NULL,
    title TEXT NOT NULL,
    summary TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_epics_month ON epics (month);
";

/// Holds the live connection and implements every storage port.
///
/// One `PgStore` is constructed per process and shared behind `Arc` —
/// each trait impl locks [`PgStore::client`] rather than opening its own
/// connection. The mutex is only ever held across one query/transaction,
/// not across an await point spanning caller logic, so it never becomes a
/// cross-stage bottleneck under the runner's bounded concurrency.
pub struct PgStore {
    client: Mutex<Client>,
}

impl PgStore {
    /// Connect and ensure the schema exists.
    ///
    /// # Errors
    /// Returns [`PostgresError::Connection`] if the connection fails, or
    /// propagates a query error if schema creation fails.
    pub async fn connect(connection_string: &str) -> Result<Self, PostgresError> {
        info!("connecting to PostgreSQL");
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| {
                error!("failed to connect to PostgreSQL: {e}");
                PostgresError::Connection(e.to_string())
            })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {e}");
            }
        });

        client.batch_execute(SCHEMA).await?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }
}
