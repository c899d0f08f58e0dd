//! `arcline enrich` — C6 enrichment processor (spec §4.6).
//!
//! Drains seed Event Families through
//! [`arcline_core::enrichment::EnrichmentProcessor::enrich`]. `--dry-run`
//! is not offered: every step's persistence happens inside `enrich` itself,
//! with no separable preview step (same tradeoff as `assemble`).

use clap::Args;

use arcline_core::runner::{ItemOutcome, RunMode, StageRunner};

use crate::cli_args::RunArgs;
use crate::context::CliContext;
use crate::items::EnrichItem;
use crate::output;

#[derive(Args, Debug)]
pub struct EnrichArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn run(ctx: &CliContext, args: EnrichArgs) -> anyhow::Result<()> {
    let efs = ctx.efs.load_seed_efs(args.run.limit).await?;
    if efs.is_empty() {
        output::print_info("no seed Event Families awaiting enrichment");
        return Ok(());
    }
    if args.run.dry_run {
        output::print_info(&format!(
            "--dry-run: {} seed Event Families would be enriched (no preview step available, see --help)",
            efs.len()
        ));
        return Ok(());
    }
    if args.run.resume {
        output::print_info("--resume is a no-op here: load_seed_efs already excludes enriched EFs");
    }

    let processor = std::sync::Arc::new(arcline_core::enrichment::EnrichmentProcessor::new(
        ctx.llm.clone(),
        ctx.centroids.clone(),
        ctx.efs.clone(),
        ctx.titles.clone(),
        ctx.config.centroid_matcher,
        ctx.config.enrichment,
    ));

    let runner = StageRunner::new(ctx.checkpoints.clone(), ctx.config.runner);
    let mode = match args.run.batch {
        Some(limit) => RunMode::Batch { limit },
        None => RunMode::Drain,
    };
    let items: Vec<EnrichItem> = efs.into_iter().map(EnrichItem).collect();

    let summary = runner
        .run("c6_enrich", mode, items, move |item| {
            let processor = processor.clone();
            async move {
                processor.enrich(item.0).await?;
                Ok(ItemOutcome::Succeeded)
            }
        })
        .await?;

    output::print_success(&format!(
        "C6: attempted {}, succeeded {}, dropped {}, retried {}",
        summary.attempted, summary.succeeded, summary.dropped, summary.retried
    ));
    Ok(())
}
