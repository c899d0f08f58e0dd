//! C5: P3 Event Family assembler (spec §4.5).
//!
//! Batches unassigned strategic titles, asks the LLM to propose coherent
//! clusters with a rationale and confidence, validates the response
//! against the batch and the cardinality invariants, persists the
//! surviving Event Families, and generates a Framed Narrative per EF over
//! its own member titles (step 6). Grounded in the batching/validation/
//! narrative-generation shape of `original_source/apps/gen1/processor.py`
//! (read via `_INDEX.md`); JSON handling follows the tolerant-extraction
//! port contract in [`crate::traits::LlmClient`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::{NarrativeConfig, P3Config};
use crate::domain::{EfStatus, EventFamily, EventFamilyId, NarrativeEntityType, Title, TitleId};
use crate::error::{PipelineError, Result};
use crate::narrative_extractor::NarrativeExtractor;
use crate::traits::{
    CompletionOptions, EventFamilyStore, JsonCompletion, LlmClient, NarrativeStore, TitleStore,
};

const SYSTEM_PROMPT: &str = "You group news headlines into coherent strategic Event Families. \
Each Event Family must share a single underlying real-world event or policy action. \
Respond with JSON only.";

/// One cluster as proposed by the LLM, before validation.
#[derive(Debug, Clone, Deserialize)]
struct ProposedFamily {
    member_title_ids: Vec<String>,
    title: String,
    summary: String,
    event_type: String,
    primary_theater: String,
    confidence: f64,
    rationale: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProposedBatch {
    families: Vec<ProposedFamily>,
}

/// Outcome of assembling one batch.
#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    pub families_created: usize,
    pub titles_assigned: usize,
    pub titles_dropped: Vec<(TitleId, String)>,
}

/// Orchestrates P3 batches end to end.
pub struct EventFamilyAssembler {
    titles: Arc<dyn TitleStore>,
    efs: Arc<dyn EventFamilyStore>,
    llm: Arc<dyn LlmClient>,
    narratives: NarrativeExtractor,
    config: P3Config,
}

impl EventFamilyAssembler {
    #[must_use]
    pub fn new(
        titles: Arc<dyn TitleStore>,
        efs: Arc<dyn EventFamilyStore>,
        llm: Arc<dyn LlmClient>,
        narrative_store: Arc<dyn NarrativeStore>,
        narrative_config: NarrativeConfig,
        config: P3Config,
    ) -> Self {
        let narratives = NarrativeExtractor::new(llm.clone(), narrative_store, narrative_config);
        Self {
            titles,
            efs,
            llm,
            narratives,
            config,
        }
    }

    /// Assemble Event Families for one batch of titles, already loaded by
    /// the caller (typically via [`crate::traits::TitleStore::load_unassigned_strategic`]
    /// driven by the runner, spec §4.9).
    pub async fn assemble_batch(&self, batch: &[Title]) -> Result<AssemblyReport> {
        if batch.is_empty() {
            return Ok(AssemblyReport::default());
        }

        let prompt = self.build_prompt(batch);
        let proposed = self.request_with_retry(&prompt).await?;

        let batch_ids: HashSet<TitleId> = batch.iter().map(|t| t.id).collect();
        let mut report = AssemblyReport::default();

        for family in proposed.families {
            match self.validate_and_persist(&family, &batch_ids).await {
                Ok(assigned) => {
                    report.families_created += 1;
                    report.titles_assigned += assigned;
                }
                Err((id_strs, reason)) => {
                    for raw in id_strs {
                        if let Some(id) = parse_title_id(&raw) {
                            report.titles_dropped.push((id, reason.clone()));
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    fn build_prompt(&self, batch: &[Title]) -> String {
        let mut lines = String::new();
        for t in batch {
            lines.push_str(&format!("{} :: {}\n", t.id, t.display_text));
        }
        format!(
            "Group the following titles (id :: headline) into Event Families. \
Every member_title_ids entry must be one of the ids listed below, verbatim. \
Return JSON: {{\"families\": [{{\"member_title_ids\": [...], \"title\": ..., \
\"summary\": ..., \"event_type\": ..., \"primary_theater\": ..., \
\"confidence\": 0.0-1.0, \"rationale\": ...}}]}}\n\nTitles:\n{lines}"
        )
    }

    /// One call, with a single retry at lower temperature if the first
    /// response doesn't parse (spec §7 `LlmMalformed` handling).
    async fn request_with_retry(&self, prompt: &str) -> Result<ProposedBatch> {
        let opts = CompletionOptions::default().with_temperature(self.config.retry_temperature * 2.0);
        match self.llm.complete_json(SYSTEM_PROMPT, prompt, opts).await? {
            JsonCompletion::Ok(value) => {
                if let Ok(parsed) = serde_json::from_value::<ProposedBatch>(value) {
                    return Ok(parsed);
                }
            }
            _ => {}
        }

        let retry_opts = CompletionOptions::default().with_temperature(self.config.retry_temperature);
        match self.llm.complete_json(SYSTEM_PROMPT, prompt, retry_opts).await? {
            JsonCompletion::Ok(value) => serde_json::from_value::<ProposedBatch>(value)
                .map_err(|e| PipelineError::LlmMalformed(format!("EF batch schema mismatch: {e}"))),
            JsonCompletion::ParseError(raw) => Err(PipelineError::LlmMalformed(format!(
                "EF batch response did not parse as JSON after retry: {raw}"
            ))),
            JsonCompletion::SchemaError(raw) => Err(PipelineError::LlmMalformed(format!(
                "EF batch response failed schema validation after retry: {raw}"
            ))),
        }
    }

    /// Validate one proposed family against the batch membership and the
    /// EventFamily invariants, then persist and assign titles. Returns the
    /// offending ids and a reason on failure so the caller can record a
    /// per-title drop (spec §7 `Validation`).
    async fn validate_and_persist(
        &self,
        family: &ProposedFamily,
        batch_ids: &HashSet<TitleId>,
    ) -> std::result::Result<usize, (Vec<String>, String)> {
        if family.member_title_ids.is_empty() {
            return Err((vec![], "empty member_title_ids".to_string()));
        }

        let mut members = Vec::with_capacity(family.member_title_ids.len());
        for raw in &family.member_title_ids {
            let Some(id) = parse_title_id(raw) else {
                return Err((
                    family.member_title_ids.clone(),
                    format!("id not a valid uuid: {raw}"),
                ));
            };
            if !batch_ids.contains(&id) {
                return Err((
                    family.member_title_ids.clone(),
                    format!("id {id} is outside the input batch"),
                ));
            }
            members.push(id);
        }

        // Clamped, not dropped: §4.5 step 4 is the operation-specific rule
        // ("confidence clamped to [0,1]") and takes precedence over the
        // generic per-item-drop taxonomy in §7, which only applies where a
        // step doesn't already spell out its own recovery. See DESIGN.md.
        let confidence = family.confidence.clamp(0.0, 1.0);

        let ef = EventFamily {
            id: EventFamilyId::new(),
            title: family.title.clone(),
            summary: family.summary.clone(),
            key_actors: Vec::new(),
            event_type: family.event_type.clone(),
            primary_theater: family.primary_theater.clone(),
            event_start: chrono::Utc::now(),
            event_end: None,
            source_title_ids: members.clone(),
            confidence,
            coherence_rationale: family.rationale.clone(),
            status: EfStatus::Seed,
            tags: Vec::new(),
            context: crate::domain::EfContext::default(),
            enrichment: None,
            ctm_id: None,
        };

        if !ef.has_valid_span() {
            return Err((
                family.member_title_ids.clone(),
                "event_end precedes event_start".to_string(),
            ));
        }

        self.efs
            .create_ef(&ef)
            .await
            .map_err(|e| (family.member_title_ids.clone(), e.to_string()))?;

        let assigned = self
            .titles
            .assign_to_ef(&members, ef.id, ef.confidence, &ef.coherence_rationale)
            .await
            .map_err(|e| (family.member_title_ids.clone(), e.to_string()))?;

        self.generate_narratives(&ef, &members).await;

        Ok(assigned)
    }

    /// Step 6: a second LLM call per surviving EF, generating Framed
    /// Narratives over its own member titles and persisting them keyed by
    /// (event_id, label) — reuses C8's discovery pipeline rather than a
    /// parallel narrative concept, scoped to `NarrativeEntityType::Event`.
    /// Best-effort: an EF with too few members for the LLM to propose
    /// distinct framings still seeds fine, it just carries no narrative
    /// frames yet.
    async fn generate_narratives(&self, ef: &EventFamily, member_ids: &[TitleId]) {
        let members = match self.titles.get_titles(member_ids).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(ef_id = %ef.id, error = %e, "could not load member titles for narrative generation");
                return;
            }
        };
        if let Err(e) = self
            .narratives
            .extract(NarrativeEntityType::Event, &ef.id.to_string(), &members)
            .await
        {
            tracing::warn!(ef_id = %ef.id, error = %e, "narrative generation failed for new EF");
        }
    }
}

fn parse_title_id(raw: &str) -> Option<TitleId> {
    uuid::Uuid::parse_str(raw).ok().map(crate::domain::TitleId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionTriple, Entity, Verdict};
    use crate::traits::SortOrder;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeLlm {
        response: String,
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(&self, _s: &str, _u: &str, _o: CompletionOptions) -> Result<String> {
            Ok(self.response.clone())
        }
        async fn complete_json(
            &self,
            _s: &str,
            _u: &str,
            _o: CompletionOptions,
        ) -> Result<JsonCompletion> {
            match serde_json::from_str(&self.response) {
                Ok(v) => Ok(JsonCompletion::Ok(v)),
                Err(e) => Ok(JsonCompletion::ParseError(e.to_string())),
            }
        }
        async fn chat_completion(
            &self,
            _m: &[crate::traits::ChatMessage],
            _o: CompletionOptions,
        ) -> Result<String> {
            Ok(self.response.clone())
        }
    }

    struct FakeTitleStore;

    #[async_trait]
    impl TitleStore for FakeTitleStore {
        async fn upsert_title(&self, _record: &Title) -> Result<()> {
            Ok(())
        }
        async fn mark_verdict(
            &self,
            _id: TitleId,
            _verdict: Verdict,
            _reason: &str,
            _entities: Vec<Entity>,
            _triple: Option<ActionTriple>,
        ) -> Result<()> {
            Ok(())
        }
        async fn assign_to_ef(
            &self,
            ids: &[TitleId],
            _ef_id: EventFamilyId,
            _confidence: f64,
            _rationale: &str,
        ) -> Result<usize> {
            Ok(ids.len())
        }
        async fn load_unassigned_strategic(
            &self,
            _limit: usize,
            _order: SortOrder,
        ) -> Result<Vec<Title>> {
            Ok(vec![])
        }
        async fn load_unfiltered(&self, _limit: usize) -> Result<Vec<Title>> {
            Ok(vec![])
        }
        async fn get_title(&self, _id: TitleId) -> Result<Option<Title>> {
            Ok(None)
        }
        async fn get_titles(&self, _ids: &[TitleId]) -> Result<Vec<Title>> {
            Ok(vec![])
        }
    }

    struct FakeNarrativeStore;

    #[async_trait]
    impl NarrativeStore for FakeNarrativeStore {
        async fn replace_frames(
            &self,
            _entity_type: crate::domain::NarrativeEntityType,
            _entity_id: &str,
            _frames: Vec<crate::domain::NarrativeFrame>,
        ) -> Result<()> {
            Ok(())
        }
        async fn load_frames(
            &self,
            _entity_type: crate::domain::NarrativeEntityType,
            _entity_id: &str,
        ) -> Result<Vec<crate::domain::NarrativeFrame>> {
            Ok(vec![])
        }
    }

    struct FakeEfStore {
        created: Mutex<Vec<EventFamily>>,
    }

    #[async_trait]
    impl EventFamilyStore for FakeEfStore {
        async fn create_ef(&self, ef: &EventFamily) -> Result<()> {
            self.created.lock().unwrap().push(ef.clone());
            Ok(())
        }
        async fn get_ef(&self, _id: EventFamilyId) -> Result<Option<EventFamily>> {
            Ok(None)
        }
        async fn update_ef(&self, _ef: &EventFamily) -> Result<()> {
            Ok(())
        }
        async fn load_seed_efs(&self, _limit: usize) -> Result<Vec<EventFamily>> {
            Ok(vec![])
        }
        async fn load_active_efs_for_month(
            &self,
            _month: chrono::NaiveDate,
        ) -> Result<Vec<EventFamily>> {
            Ok(vec![])
        }
    }

    fn title() -> Title {
        Title::new("US sanctions Iran", "us sanctions iran", "pub", Utc::now(), "en")
    }

    #[tokio::test]
    async fn valid_cluster_creates_ef_and_assigns_titles() {
        let t1 = title();
        let t2 = title();
        let response = format!(
            r#"{{"families": [{{"member_title_ids": ["{}", "{}"], "title": "Iran sanctions", "summary": "s", "event_type": "sanctions", "primary_theater": "middle_east", "confidence": 0.9, "rationale": "shared actor and action"}}]}}"#,
            t1.id, t2.id
        );
        let llm = Arc::new(FakeLlm { response });
        let titles_store = Arc::new(FakeTitleStore);
        let ef_store = Arc::new(FakeEfStore {
            created: Mutex::new(vec![]),
        });
        let assembler = EventFamilyAssembler::new(
            titles_store,
            ef_store.clone(),
            llm,
            Arc::new(FakeNarrativeStore),
            NarrativeConfig::default(),
            P3Config::default(),
        );

        let report = assembler.assemble_batch(&[t1, t2]).await.unwrap();
        assert_eq!(report.families_created, 1);
        assert_eq!(report.titles_assigned, 2);
        assert!(report.titles_dropped.is_empty());
        assert_eq!(ef_store.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn id_outside_batch_is_dropped_not_fatal() {
        let t1 = title();
        let outsider = TitleId::new();
        let response = format!(
            r#"{{"families": [{{"member_title_ids": ["{}", "{}"], "title": "x", "summary": "s", "event_type": "e", "primary_theater": "t", "confidence": 0.5, "rationale": "r"}}]}}"#,
            t1.id, outsider
        );
        let llm = Arc::new(FakeLlm { response });
        let titles_store = Arc::new(FakeTitleStore);
        let ef_store = Arc::new(FakeEfStore {
            created: Mutex::new(vec![]),
        });
        let assembler = EventFamilyAssembler::new(
            titles_store,
            ef_store,
            llm,
            Arc::new(FakeNarrativeStore),
            NarrativeConfig::default(),
            P3Config::default(),
        );

        let report = assembler.assemble_batch(&[t1]).await.unwrap();
        assert_eq!(report.families_created, 0);
        assert!(!report.titles_dropped.is_empty());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let llm = Arc::new(FakeLlm {
            response: "{}".to_string(),
        });
        let titles_store = Arc::new(FakeTitleStore);
        let ef_store = Arc::new(FakeEfStore {
            created: Mutex::new(vec![]),
        });
        let assembler = EventFamilyAssembler::new(
            titles_store,
            ef_store,
            llm,
            Arc::new(FakeNarrativeStore),
            NarrativeConfig::default(),
            P3Config::default(),
        );
        let report = assembler.assemble_batch(&[]).await.unwrap();
        assert_eq!(report.families_created, 0);
    }
}
