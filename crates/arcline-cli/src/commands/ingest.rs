//! `arcline ingest` — thin bridge for pre-extracted titles (JSONL) into
//! the title store.
//!
//! Raw ingestion and entity/action-triple extraction (P1) are out of
//! scope: this command assumes an external process already produced one
//! JSON [`arcline_core::domain::Title`] per line and only does the
//! idempotent upsert, exactly the shape
//! [`arcline_core::traits::TitleStore::upsert_title`] already guarantees.

use clap::Args;

use arcline_core::domain::Title;

use crate::context::CliContext;
use crate::output;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Path to a JSONL file, one `Title` record per line.
    #[arg(long)]
    pub path: String,
}

pub async fn run(ctx: &CliContext, args: IngestArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", args.path))?;

    let mut upserted = 0usize;
    let mut failed = 0usize;
    for (lineno, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let title: Title = match serde_json::from_str(line) {
            Ok(t) => t,
            Err(e) => {
                output::print_warning(&format!("line {}: {e}", lineno + 1));
                failed += 1;
                continue;
            }
        };
        match ctx.titles.upsert_title(&title).await {
            Ok(()) => upserted += 1,
            Err(e) => {
                output::print_warning(&format!("line {}: upsert failed: {e}", lineno + 1));
                failed += 1;
            }
        }
    }

    output::print_success(&format!("ingested {upserted} title(s), {failed} failed"));
    Ok(())
}
