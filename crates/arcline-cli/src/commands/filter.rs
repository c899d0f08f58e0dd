//! `arcline filter` — P2 strategic filter (spec §4.4).
//!
//! Drains titles awaiting a verdict, runs each through
//! [`arcline_core::filter::StrategicFilter`], and persists the verdict plus
//! the Stage-2 graph sync. `--dry-run` skips the persistence step since
//! `evaluate` itself performs no writes.

use clap::Args;

use arcline_core::filter::StrategicFilter;
use arcline_core::runner::{ItemOutcome, RunMode, StageRunner};

use crate::cli_args::RunArgs;
use crate::context::CliContext;
use crate::items::FilterItem;
use crate::output;

#[derive(Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn run(ctx: &CliContext, args: FilterArgs) -> anyhow::Result<()> {
    let titles = ctx.titles.load_unfiltered(args.run.limit).await?;
    if titles.is_empty() {
        output::print_info("no titles awaiting a P2 verdict");
        return Ok(());
    }

    if args.run.resume {
        output::print_info("--resume is a no-op here: load_unfiltered already excludes processed titles");
    }

    let filter = std::sync::Arc::new(StrategicFilter::new(ctx.graph.clone(), ctx.config.p2.clone()));
    let titles_store = ctx.titles.clone();
    let graph = ctx.graph.clone();
    let dry_run = args.run.dry_run;

    let runner = StageRunner::new(ctx.checkpoints.clone(), ctx.config.runner);
    let mode = match args.run.batch {
        Some(limit) => RunMode::Batch { limit },
        None => RunMode::Drain,
    };

    let items: Vec<FilterItem> = titles.into_iter().map(FilterItem).collect();

    let summary = runner
        .run("p2_filter", mode, items, move |item| {
            let filter = filter.clone();
            let titles_store = titles_store.clone();
            let graph = graph.clone();
            async move {
                let title = item.0;
                let verdict = filter
                    .evaluate(title.id, &title.normalized_text, &title.entities)
                    .await;

                if dry_run {
                    tracing::info!(title = %title.id, keep = verdict.keep, reason = %verdict.reason, "dry-run verdict");
                    return Ok(ItemOutcome::Succeeded);
                }

                let final_verdict = if verdict.keep {
                    arcline_core::domain::Verdict::Strategic
                } else {
                    arcline_core::domain::Verdict::NonStrategic
                };
                titles_store
                    .mark_verdict(
                        title.id,
                        final_verdict,
                        &verdict.reason,
                        title.entities.clone(),
                        title.action_triple.clone(),
                    )
                    .await?;
                graph.sync_title(&title).await?;
                if let Some(triple) = &title.action_triple {
                    graph.sync_action_triple(title.id, triple).await?;
                }
                Ok(ItemOutcome::Succeeded)
            }
        })
        .await?;

    output::print_success(&format!(
        "P2: attempted {}, succeeded {}, dropped {}, retried {}",
        summary.attempted, summary.succeeded, summary.dropped, summary.retried
    ));
    Ok(())
}
