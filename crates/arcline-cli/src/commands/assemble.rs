//! `arcline assemble` — P3 Event Family assembler (spec §4.5).
//!
//! Loads unassigned strategic titles, splits them into
//! `config.p3.batch_size`-sized chunks (one chunk = one runner item, since
//! [`arcline_core::assembler::EventFamilyAssembler::assemble_batch`]
//! operates on a whole batch at a time), and drives each chunk through the
//! assembler. `--dry-run` prints the chunk composition without calling the
//! assembler, since `assemble_batch` persists internally and has no
//! preview-only mode.

use clap::Args;

use arcline_core::assembler::EventFamilyAssembler;
use arcline_core::runner::{ItemOutcome, RunMode, StageRunner};
use arcline_core::traits::SortOrder;

use crate::cli_args::RunArgs;
use crate::context::CliContext;
use crate::items::TitleBatch;
use crate::output;

#[derive(Args, Debug)]
pub struct AssembleArgs {
    #[command(flatten)]
    pub run: RunArgs,
}

pub async fn run(ctx: &CliContext, args: AssembleArgs) -> anyhow::Result<()> {
    let limit = args.run.limit.min(ctx.config.p3.max_titles);
    let titles = ctx
        .titles
        .load_unassigned_strategic(limit, SortOrder::PublicationDescending)
        .await?;
    if titles.is_empty() {
        output::print_info("no unassigned strategic titles to assemble");
        return Ok(());
    }

    if args.run.resume {
        output::print_info("--resume is a no-op here: load_unassigned_strategic already excludes assigned titles");
    }

    let batch_size = ctx.config.p3.batch_size.max(1);
    let chunks: Vec<TitleBatch> = titles
        .chunks(batch_size)
        .map(|c| TitleBatch(c.to_vec()))
        .collect();

    let assembler = std::sync::Arc::new(EventFamilyAssembler::new(
        ctx.titles.clone(),
        ctx.efs.clone(),
        ctx.llm.clone(),
        ctx.narratives.clone(),
        ctx.config.narrative,
        ctx.config.p3,
    ));
    let dry_run = args.run.dry_run;

    let runner = StageRunner::new(ctx.checkpoints.clone(), ctx.config.runner);
    let mode = match args.run.batch {
        Some(limit) => RunMode::Batch { limit },
        None => RunMode::Drain,
    };

    let runner_result = runner
        .run("p3_assemble", mode, chunks, move |chunk| {
            let assembler = assembler.clone();
            async move {
                if dry_run {
                    tracing::info!(titles = chunk.0.len(), "dry-run: would assemble this batch");
                    return Ok(ItemOutcome::Succeeded);
                }
                let report = assembler.assemble_batch(&chunk.0).await?;
                tracing::info!(
                    families_created = report.families_created,
                    titles_assigned = report.titles_assigned,
                    titles_dropped = report.titles_dropped.len(),
                    "batch assembled"
                );
                Ok(ItemOutcome::Succeeded)
            }
        })
        .await?;

    output::print_success(&format!(
        "P3: attempted {} batches, succeeded {}, dropped {}, retried {}",
        runner_result.attempted, runner_result.succeeded, runner_result.dropped, runner_result.retried
    ));
    Ok(())
}
