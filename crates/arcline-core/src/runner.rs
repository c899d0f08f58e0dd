//! C9: generic stage driver (spec §4.9, §5).
//!
//! Every pipeline stage (P2, P3, enrichment, narrative extraction) is
//! driven through the same shape: load a checkpoint, pull a batch (or the
//! full eligible set in "drain" mode), process items with bounded
//! concurrency, advance-and-save the checkpoint per item, and clear the
//! checkpoint on a clean full drain. Concurrency follows spec §5: a
//! semaphore gates the number of in-flight items, sized from
//! [`crate::config::RunnerConfig`]; a `Transient` error is retried in
//! place with exponential backoff up to `max_retries` before the item is
//! counted as dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::checkpointing::CheckpointStore;
use crate::config::RunnerConfig;
use crate::domain::Checkpoint;
use crate::error::{PipelineError, Result};

/// How a call to [`StageRunner::run`] should bound its work.
#[derive(Debug, Clone, Copy)]
pub enum RunMode {
    /// Process at most `limit` items, leaving the checkpoint in place for
    /// the next invocation (spec §6 `--limit`/`--batch`).
    Batch { limit: usize },
    /// Process every eligible item, clearing the checkpoint once the run
    /// completes cleanly (spec §6, no flag: full drain).
    Drain,
}

/// Per-item outcome the runner uses to decide retry/drop/hard-stop (spec
/// §7).
pub enum ItemOutcome {
    Succeeded,
    /// Dropped after a validation or invariant failure; checkpoint still
    /// advances past it.
    Dropped(String),
}

/// Summary returned after a run completes.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub dropped: usize,
    pub retried: usize,
}

/// An item the runner can drive: produces its own checkpoint identifier
/// so the runner never needs a separate id-extraction closure.
pub trait RunnableItem: Clone + Send + 'static {
    fn item_id(&self) -> String;
}

/// Drives one stage (identified by `phase`) over a caller-supplied item
/// list, with bounded concurrency and checkpointing.
pub struct StageRunner {
    checkpoints: CheckpointStore,
    config: RunnerConfig,
}

impl StageRunner {
    #[must_use]
    pub fn new(checkpoints: CheckpointStore, config: RunnerConfig) -> Self {
        Self { checkpoints, config }
    }

    /// Run `phase` over `items`, invoking `process` for each with bounded
    /// concurrency (spec §5).
    pub async fn run<T, F, Fut>(
        &self,
        phase: &str,
        mode: RunMode,
        items: Vec<T>,
        process: F,
    ) -> Result<RunSummary>
    where
        T: RunnableItem,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<ItemOutcome>> + Send + 'static,
    {
        let mut checkpoint = self.checkpoints.load(phase)?;

        let capped: Vec<T> = match mode {
            RunMode::Batch { limit } => items.into_iter().take(limit).collect(),
            RunMode::Drain => items,
        };
        let attempted = capped.len();

        let semaphore = Arc::new(Semaphore::new(self.config.item_concurrency.max(1)));
        let process = Arc::new(process);
        let max_retries = self.config.max_retries;

        let mut joinset: JoinSet<(String, Result<ItemOutcome>, u32)> = JoinSet::new();
        for item in capped {
            let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
                PipelineError::Transient(format!("semaphore closed unexpectedly: {e}"))
            })?;
            let process = process.clone();
            let item_id = item.item_id();
            let phase = phase.to_string();
            let span = tracing::info_span!("stage_item", phase = %phase, item_id = %item_id);
            joinset.spawn(async move {
                let _permit = permit;
                let mut retries = 0u32;
                loop {
                    let result = process(item.clone()).await;
                    match &result {
                        Err(e) if e.is_retryable() && retries < max_retries => {
                            retries += 1;
                            tracing::debug!(parent: &span, outcome = "retry", attempt = retries, "transient error, retrying");
                            tokio::time::sleep(Duration::from_millis(
                                100 * 2u64.saturating_pow(retries),
                            ))
                            .await;
                            continue;
                        }
                        _ => {
                            let outcome = match &result {
                                Ok(ItemOutcome::Succeeded) => "succeeded",
                                Ok(ItemOutcome::Dropped(_)) => "dropped",
                                Err(_) => "failed",
                            };
                            tracing::info!(parent: &span, outcome, "item finished");
                            return (item_id, result, retries);
                        }
                    }
                }
            });
        }

        let mut summary = RunSummary {
            attempted,
            ..Default::default()
        };
        while let Some(joined) = joinset.join_next().await {
            let (item_id, result, retries) = joined
                .map_err(|e| PipelineError::Transient(format!("stage task panicked: {e}")))?;
            summary.retried += retries as usize;
            match result {
                Ok(ItemOutcome::Succeeded) => {
                    summary.succeeded += 1;
                    self.checkpoints
                        .advance_and_save(phase, &mut checkpoint, item_id, true)?;
                }
                Ok(ItemOutcome::Dropped(reason)) => {
                    summary.dropped += 1;
                    tracing::warn!(item = %item_id, reason = %reason, "item dropped");
                    self.checkpoints
                        .advance_and_save(phase, &mut checkpoint, item_id, false)?;
                }
                Err(e) if e.is_per_item() => {
                    summary.dropped += 1;
                    tracing::warn!(item = %item_id, error = %e, "item failed validation");
                    self.checkpoints
                        .advance_and_save(phase, &mut checkpoint, item_id, false)?;
                }
                Err(e) => return Err(e),
            }
        }

        if matches!(mode, RunMode::Drain) {
            self.checkpoints.clear(phase)?;
        }

        Ok(summary)
    }

    #[must_use]
    pub fn checkpoint_for(&self, phase: &str) -> Result<Checkpoint> {
        self.checkpoints.load(phase)
    }
}
