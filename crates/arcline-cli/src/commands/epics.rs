//! `arcline epics` — epic assembler, run as its own subcommand for one
//! calendar month (SPEC_FULL §4.11).

use clap::Args;

use arcline_core::epic_assembler::EpicAssembler;

use crate::context::CliContext;
use crate::output;

#[derive(Args, Debug)]
pub struct EpicsArgs {
    /// Calendar month to assemble epics for, as `YYYY-MM-DD` (day is
    /// ignored beyond anchoring the month; pass the first of the month).
    #[arg(long)]
    pub month: String,
}

pub async fn run(ctx: &CliContext, args: EpicsArgs) -> anyhow::Result<()> {
    let month = chrono::NaiveDate::parse_from_str(&args.month, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("--month must be YYYY-MM-DD: {e}"))?;

    let assembler = EpicAssembler::new(
        ctx.efs.clone(),
        ctx.epics.clone(),
        ctx.llm.clone(),
        ctx.config.epic,
    );
    let epics = assembler.assemble_for_month(month).await?;
    output::print_success(&format!("{} epic(s) assembled for {month}", epics.len()));
    let mut table = output::create_table();
    table.set_header(vec!["title", "bridge tags", "member EFs"]);
    for epic in &epics {
        table.add_row(vec![
            epic.title.clone(),
            epic.bridge_tags.join(", "),
            epic.member_ef_ids.len().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
