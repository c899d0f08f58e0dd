//! Arcline pipeline CLI: one subcommand per stage, each wired at startup
//! to the concrete Postgres/Neo4j/Anthropic adapters (spec §6).

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli_args;
mod commands;
mod context;
mod env;
mod items;
mod output;

use commands::{assemble, connectivity, enrich, epics, filter, ingest, narrative};
use context::CliContext;

#[derive(Parser)]
#[command(name = "arcline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Strategic headline filtering and Event Family pipeline")]
struct Cli {
    /// Emit debug-level logs.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// P2 strategic filter (spec §4.4)
    Filter(filter::FilterArgs),
    /// P3 Event Family assembler (spec §4.5)
    Assemble(assemble::AssembleArgs),
    /// C3 connectivity cache refresh (spec §4.3)
    Connectivity(connectivity::ConnectivityArgs),
    /// C6 enrichment (spec §4.6)
    Enrich(enrich::EnrichArgs),
    /// C8 on-demand narrative extraction (spec §4.8)
    Narrative(narrative::NarrativeArgs),
    /// Epic assembly for one calendar month (SPEC_FULL §4.11)
    Epics(epics::EpicsArgs),
    /// Upsert pre-extracted titles from a JSONL file
    Ingest(ingest::IngestArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    let ctx = CliContext::connect().await?;

    match cli.command {
        Commands::Filter(args) => filter::run(&ctx, args).await,
        Commands::Assemble(args) => assemble::run(&ctx, args).await,
        Commands::Connectivity(args) => connectivity::run(&ctx, args).await,
        Commands::Enrich(args) => enrich::run(&ctx, args).await,
        Commands::Narrative(args) => narrative::run(&ctx, args).await,
        Commands::Epics(args) => epics::run(&ctx, args).await,
        Commands::Ingest(args) => ingest::run(&ctx, args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_known_subcommands() {
        let cli = Cli::try_parse_from(["arcline", "connectivity"]).expect("parse connectivity");
        assert!(matches!(cli.command, Commands::Connectivity(_)));

        let cli = Cli::try_parse_from(["arcline", "epics", "--month", "2026-01-01"])
            .expect("parse epics");
        assert!(matches!(cli.command, Commands::Epics(_)));
    }

    #[test]
    fn clap_enforces_required_args() {
        assert!(Cli::try_parse_from(["arcline", "epics"]).is_err());
        assert!(Cli::try_parse_from(["arcline", "narrative"]).is_err());
    }
}
