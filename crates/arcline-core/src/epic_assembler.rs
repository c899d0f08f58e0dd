//! Epic assembler (SPEC_FULL §4.11): detects cross-centroid "epics" from
//! tag co-occurrence among a month's active Event Families.
//!
//! Five steps, grounded in `original_source/pipeline/epics/build_epics.py`:
//! 1. Bridge-tag discovery — tags spanning >= `min_centroids` distinct
//!    centroids with >= `min_sources` total member EFs, after stripping
//!    disallowed signal prefixes and a ubiquitous-tag deny list.
//! 2. Build a tag-co-occurrence graph: an edge between two bridge tags
//!    when the Jaccard index of their EF-membership sets is
//!    >= `min_jaccard`.
//! 3. Connected components of that graph are epic candidates.
//! 4. Each candidate passes an LLM coherence filter.
//! 5. Surviving candidates are persisted and titled/summarized.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::config::EpicConfig;
use crate::domain::{Epic, EpicCandidate, EventFamily, EventFamilyId};
use crate::error::{PipelineError, Result};
use crate::traits::{CompletionOptions, EpicStore, EventFamilyStore, JsonCompletion, LlmClient};

/// Tag prefixes that are allowed to act as bridges (spec §4.11 signal
/// prefixes); anything else is excluded from bridge-tag discovery.
const ALLOWED_SIGNAL_PREFIXES: &[&str] = &["org:", "place:", "person:"];

/// Tags so common they would bridge almost anything and carry no epic
/// signal.
const UBIQUITOUS_TAG_DENY_LIST: &[&str] = &["place:global", "org:united_nations", "person:unknown"];

#[derive(Debug, Clone, Deserialize)]
struct CoherenceVerdict {
    coherent: bool,
    title: String,
    summary: String,
}

pub struct EpicAssembler {
    efs: Arc<dyn EventFamilyStore>,
    epics: Arc<dyn EpicStore>,
    llm: Arc<dyn LlmClient>,
    config: EpicConfig,
}

impl EpicAssembler {
    #[must_use]
    pub fn new(
        efs: Arc<dyn EventFamilyStore>,
        epics: Arc<dyn EpicStore>,
        llm: Arc<dyn LlmClient>,
        config: EpicConfig,
    ) -> Self {
        Self {
            efs,
            epics,
            llm,
            config,
        }
    }

    /// Run the full assembly for one calendar month, returning the epics
    /// that survived the coherence filter and were persisted.
    pub async fn assemble_for_month(&self, month: chrono::NaiveDate) -> Result<Vec<Epic>> {
        let active_efs = self.efs.load_active_efs_for_month(month).await?;
        if active_efs.is_empty() {
            return Ok(Vec::new());
        }

        let bridge_tags = self.discover_bridge_tags(&active_efs);
        if bridge_tags.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.build_candidates(month, &active_efs, &bridge_tags);

        let mut epics = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(epic) = self.apply_coherence_filter(candidate).await? {
                self.epics.create(&epic).await?;
                epics.push(epic);
            }
        }
        Ok(epics)
    }

    /// Step 1: tags spanning `>= min_centroids` distinct centroids with
    /// `>= min_sources` total member EFs, after prefix and deny-list
    /// filtering.
    fn discover_bridge_tags(&self, efs: &[EventFamily]) -> HashMap<String, Vec<&EventFamily>> {
        let mut by_tag: HashMap<String, Vec<&EventFamily>> = HashMap::new();
        for ef in efs {
            for tag in &ef.tags {
                if !has_allowed_prefix(tag) || is_ubiquitous(tag) {
                    continue;
                }
                by_tag.entry(tag.clone()).or_default().push(ef);
            }
        }

        by_tag
            .into_iter()
            .filter(|(_, members)| {
                let centroid_count = members
                    .iter()
                    .filter_map(|ef| ef.ctm_id.as_ref().map(|c| c.centroid_id.clone()))
                    .collect::<HashSet<_>>()
                    .len() as u32;
                centroid_count >= self.config.min_centroids
                    && members.len() as u32 >= self.config.min_sources
            })
            .collect()
    }

    /// Steps 2-3: Jaccard graph over tag->EF-membership sets, connected
    /// components become candidates.
    fn build_candidates<'a>(
        &self,
        month: chrono::NaiveDate,
        all_efs: &[EventFamily],
        bridge_tags: &HashMap<String, Vec<&'a EventFamily>>,
    ) -> Vec<EpicCandidate> {
        let tags: Vec<&String> = bridge_tags.keys().collect();
        let membership: HashMap<&String, HashSet<EventFamilyId>> = bridge_tags
            .iter()
            .map(|(tag, members)| (tag, members.iter().map(|ef| ef.id).collect()))
            .collect();

        let mut adjacency: HashMap<&String, Vec<&String>> =
            tags.iter().map(|t| (*t, Vec::new())).collect();
        for i in 0..tags.len() {
            for j in (i + 1)..tags.len() {
                let a = tags[i];
                let b = tags[j];
                let jaccard = crate::connectivity_cache::jaccard_index(
                    &string_set(&membership[a]),
                    &string_set(&membership[b]),
                );
                if jaccard >= self.config.min_jaccard {
                    adjacency.get_mut(a).unwrap().push(b);
                    adjacency.get_mut(b).unwrap().push(a);
                }
            }
        }

        let mut visited: HashSet<&String> = HashSet::new();
        let mut candidates = Vec::new();
        for tag in &tags {
            if visited.contains(*tag) {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![*tag];
            while let Some(t) = stack.pop() {
                if !visited.insert(t) {
                    continue;
                }
                component.push(t.to_string());
                for neighbor in &adjacency[t] {
                    if !visited.contains(*neighbor) {
                        stack.push(*neighbor);
                    }
                }
            }

            let mut member_ef_ids: HashSet<EventFamilyId> = HashSet::new();
            for t in &component {
                member_ef_ids.extend(membership[t].iter().copied());
            }
            let centroid_count = all_efs
                .iter()
                .filter(|ef| member_ef_ids.contains(&ef.id))
                .filter_map(|ef| ef.ctm_id.as_ref().map(|c| c.centroid_id.clone()))
                .collect::<HashSet<_>>()
                .len() as u32;

            candidates.push(EpicCandidate {
                month,
                bridge_tags: component,
                member_ef_ids: member_ef_ids.into_iter().collect(),
                centroid_count,
            });
        }
        candidates
    }

    /// Step 4: an LLM judges whether the candidate's member EFs actually
    /// tell one coherent cross-cutting story, and drafts a title/summary
    /// if so.
    async fn apply_coherence_filter(&self, candidate: EpicCandidate) -> Result<Option<Epic>> {
        let mut ef_summaries = Vec::with_capacity(candidate.member_ef_ids.len());
        for id in &candidate.member_ef_ids {
            if let Some(ef) = self.efs.get_ef(*id).await? {
                ef_summaries.push(format!("- {}: {}", ef.title, ef.summary));
            }
        }

        let prompt = format!(
            "These Event Families are linked by the shared tags {:?}. Do they describe \
one coherent cross-cutting epic (a single larger strategic thread), or are they an \
accidental tag collision? If coherent, draft a title and a two-sentence summary. \
Respond as JSON: {{\"coherent\": bool, \"title\": .., \"summary\": ..}}\n\n{}",
            candidate.bridge_tags,
            ef_summaries.join("\n")
        );
        let opts = CompletionOptions::default().with_temperature(0.2);
        let value = match self
            .llm
            .complete_json(
                "You judge whether a set of events forms one coherent strategic epic. Respond with JSON only.",
                &prompt,
                opts,
            )
            .await?
        {
            JsonCompletion::Ok(v) => v,
            JsonCompletion::ParseError(raw) => {
                return Err(PipelineError::LlmMalformed(format!(
                    "epic coherence response did not parse as JSON: {raw}"
                )))
            }
            JsonCompletion::SchemaError(raw) => {
                return Err(PipelineError::LlmMalformed(format!(
                    "epic coherence response failed schema validation: {raw}"
                )))
            }
        };
        let verdict: CoherenceVerdict = serde_json::from_value(value)
            .map_err(|e| PipelineError::LlmMalformed(format!("coherence schema mismatch: {e}")))?;

        if !verdict.coherent {
            return Ok(None);
        }

        Ok(Some(Epic {
            id: crate::domain::EpicId::new(),
            month: candidate.month,
            bridge_tags: candidate.bridge_tags,
            member_ef_ids: candidate.member_ef_ids,
            centroid_count: candidate.centroid_count,
            title: verdict.title,
            summary: verdict.summary,
        }))
    }
}

fn has_allowed_prefix(tag: &str) -> bool {
    ALLOWED_SIGNAL_PREFIXES.iter().any(|p| tag.starts_with(*p))
}

fn is_ubiquitous(tag: &str) -> bool {
    UBIQUITOUS_TAG_DENY_LIST.contains(&tag)
}

fn string_set(ids: &HashSet<EventFamilyId>) -> HashSet<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
