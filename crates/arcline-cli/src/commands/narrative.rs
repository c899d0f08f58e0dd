//! `arcline narrative` — C8 on-demand narrative extraction (spec §4.8,
//! §6 `POST /extract` contract, mounted here as a CLI operation rather than
//! HTTP per the Non-goal on the admin service's implementation).
//!
//! A CTM has no single natural id string, so this command composes one
//! from its three parts (`centroid:track:YYYY-MM-DD`) purely as an
//! internal convention for addressing it from the command line and for the
//! `entity_id` recorded against stored frames; nothing elsewhere in the
//! pipeline depends on that format.

use clap::{Args, ValueEnum};

use arcline_core::domain::{EventFamilyId, NarrativeEntityType, TitleId};
use arcline_core::extract::validate_extract_request;
use arcline_core::narrative_extractor::NarrativeExtractor;

use crate::context::CliContext;
use crate::output;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Event,
    Ctm,
}

#[derive(Args, Debug)]
pub struct NarrativeArgs {
    #[arg(long, value_enum)]
    pub kind: EntityKind,

    /// Event Family id, required when `--kind event`.
    #[arg(long)]
    pub ef_id: Option<String>,

    /// Centroid id, required when `--kind ctm`.
    #[arg(long)]
    pub centroid: Option<String>,

    /// Track name, required when `--kind ctm`.
    #[arg(long)]
    pub track: Option<String>,

    /// Bucket month as `YYYY-MM-DD`, required when `--kind ctm`.
    #[arg(long)]
    pub month: Option<String>,
}

pub async fn run(ctx: &CliContext, args: NarrativeArgs) -> anyhow::Result<()> {
    let extractor = NarrativeExtractor::new(
        ctx.llm.clone(),
        ctx.narratives.clone(),
        ctx.config.narrative,
    );
    let ctm_minimum = ctx.config.narrative.min_titles_for_ctm as usize;

    match args.kind {
        EntityKind::Event => {
            let raw_id = args
                .ef_id
                .ok_or_else(|| anyhow::anyhow!("--ef-id is required for --kind event"))?;
            let uuid = uuid::Uuid::parse_str(&raw_id)
                .map_err(|e| anyhow::anyhow!("--ef-id is not a valid uuid: {e}"))?;
            let id = EventFamilyId(uuid);
            let ef = ctx.efs.get_ef(id).await?;
            let title_count = ef.as_ref().map(|e| e.source_title_ids.len());

            let request = arcline_core::extract::ExtractRequest {
                entity_type: NarrativeEntityType::Event,
                entity_id: id.to_string(),
            };
            validate_extract_request(&request, title_count, ctm_minimum)?;
            let ef = ef.expect("validated Some above");

            let titles = ctx.titles.get_titles(&ef.source_title_ids).await?;
            let frames = extractor
                .extract(NarrativeEntityType::Event, &request.entity_id, &titles)
                .await?;
            output::print_success(&format!(
                "extracted {} narrative frame(s) for event family {}",
                frames.len(),
                id
            ));
        }
        EntityKind::Ctm => {
            let centroid = args
                .centroid
                .ok_or_else(|| anyhow::anyhow!("--centroid is required for --kind ctm"))?;
            let track = args
                .track
                .ok_or_else(|| anyhow::anyhow!("--track is required for --kind ctm"))?;
            let month_raw = args
                .month
                .ok_or_else(|| anyhow::anyhow!("--month is required for --kind ctm"))?;
            let month = chrono::NaiveDate::parse_from_str(&month_raw, "%Y-%m-%d")
                .map_err(|e| anyhow::anyhow!("--month must be YYYY-MM-DD: {e}"))?;

            let ctm_id = arcline_core::domain::CtmId {
                centroid_id: centroid.clone(),
                track: track.clone(),
                month,
            };
            let ctm = ctx.ctm.get(&ctm_id).await?;
            let title_count = ctm.as_ref().map(|c| c.title_count as usize);
            let entity_id = format!("{centroid}:{track}:{month_raw}");

            let request = arcline_core::extract::ExtractRequest {
                entity_type: NarrativeEntityType::Ctm,
                entity_id: entity_id.clone(),
            };
            validate_extract_request(&request, title_count, ctm_minimum)?;

            let month_efs = ctx.efs.load_active_efs_for_month(month).await?;
            let mut title_ids: Vec<TitleId> = Vec::new();
            for ef in &month_efs {
                if ef.ctm_id.as_ref() == Some(&ctm_id) {
                    for tid in &ef.source_title_ids {
                        if !title_ids.contains(tid) {
                            title_ids.push(*tid);
                        }
                    }
                }
            }
            let titles = ctx.titles.get_titles(&title_ids).await?;
            let frames = extractor
                .extract(NarrativeEntityType::Ctm, &entity_id, &titles)
                .await?;
            output::print_success(&format!(
                "extracted {} narrative frame(s) for CTM {entity_id}",
                frames.len()
            ));
        }
    }
    Ok(())
}
