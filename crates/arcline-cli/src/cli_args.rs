//! Flags shared by the runner-driven stage subcommands (spec §6: "each
//! stage has a runner" exposing `--limit N --batch N --resume --dry-run").

use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// How many eligible items to pull from the store this invocation.
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Process only this many of the pulled items, leaving the rest for
    /// the next invocation (checkpoint stays in place). Omit to drain the
    /// full pulled set and clear the checkpoint.
    #[arg(long)]
    pub batch: Option<usize>,

    /// No-op beyond logging: item selection is query-driven (titles/EFs
    /// already move out of their eligible queue once processed), so a
    /// fresh invocation always resumes naturally. Accepted for surface
    /// compatibility with the documented flag set.
    #[arg(long)]
    pub resume: bool,

    /// Evaluate without persisting. Only meaningful where the engine call
    /// is read-only and the CLI layer owns the write step itself.
    #[arg(long)]
    pub dry_run: bool,
}
