//! `arcline connectivity` — C3 connectivity cache refresh (spec §4.3).
//!
//! A single bespoke call, not runner-driven: one invocation always refreshes
//! the entire cache table in one transaction.

use clap::Args;

use arcline_core::connectivity_cache::ConnectivityCacheBuilder;

use crate::context::CliContext;
use crate::output;

#[derive(Args, Debug)]
pub struct ConnectivityArgs {
    /// Compute the refresh without writing to the connectivity store.
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(ctx: &CliContext, args: ConnectivityArgs) -> anyhow::Result<()> {
    if args.dry_run {
        output::print_info(
            "--dry-run not supported here: the refresh writes inside a single transaction with no preview step",
        );
        return Ok(());
    }

    let builder = ConnectivityCacheBuilder::new(
        ctx.graph.clone(),
        ctx.titles.clone(),
        ctx.connectivity.clone(),
        ctx.config.connectivity,
    );
    let persisted = builder.refresh().await?;
    output::print_success(&format!("connectivity cache refreshed: {persisted} rows persisted"));
    Ok(())
}
