//! Per-stage resumable cursor (spec §3, §4.9, §8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-kind counters tracked alongside the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub succeeded: u64,
    #[serde(default)]
    pub failed: u64,
}

/// A stage's resumable state. Serialized to JSON and written atomically
/// (write-to-temp, rename) by [`crate::checkpoint::CheckpointStore`].
///
/// Invariant (spec §8): when present, the file must parse as JSON and
/// contain at least `last_item_id` and `processed_count` — both are
/// non-optional fields here so that invariant is structural.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_item_id: Option<String>,
    pub processed_count: u64,
    #[serde(default)]
    pub counters: Counters,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Record a single processed item, advancing the cursor.
    pub fn advance(&mut self, item_id: impl Into<String>, succeeded: bool, now: DateTime<Utc>) {
        self.last_item_id = Some(item_id.into());
        self.processed_count += 1;
        if succeeded {
            self.counters.succeeded += 1;
        } else {
            self.counters.failed += 1;
        }
        self.last_run_at = Some(now);
    }
}
