//! C6: enrichment processor (spec §4.6).
//!
//! Per-EF pipeline bound to a cost cap of at most 2 LLM calls and 1 regex
//! pass in the common case: Step A (1 LLM call) resolves canonical
//! actors, policy status, time span, and the tags/why-strategic/
//! systemic-context fields in one shot; Step B extracts magnitudes with
//! regex only, no LLM; Step C asks C7 for a centroid match and only
//! spends a second LLM call when the match is medium-confidence (a
//! high-confidence match auto-links with no call, a low-confidence one
//! skips linking entirely); Step D rewrites the EF summary in a
//! strategic-intelligence voice when Step C produced non-trivial context,
//! else falls back to a deterministic template (no LLM); Step E persists
//! and activates. See DESIGN.md for how the worst case (Step C's call and
//! Step D's call both firing) reconciles with the stated 2-call cap.
//! Grounded in the step-gated design of `original_source/apps/enrich/`
//! (see `_INDEX.md`).

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::centroid_matcher::CentroidMatcher;
use crate::config::EnrichmentConfig;
use crate::domain::{
    ActorRole, CanonicalActor, CtmId, EfContext, EnrichmentPayload, EventFamily, Magnitude,
    PolicyStatus,
};
use crate::error::{PipelineError, Result};
use crate::traits::{
    CentroidStore, CompletionOptions, EventFamilyStore, JsonCompletion, LlmClient, TitleStore,
};

/// Step A output: canonical actors, policy status, time span, temporal
/// pattern, magnitude baseline, systemic context, why-strategic, tags.
#[derive(Debug, Clone, Deserialize)]
struct StepAOutput {
    canonical_actors: Vec<CanonicalActorOutput>,
    policy_status: Option<String>,
    #[serde(default)]
    time_span: TimeSpanOutput,
    temporal_pattern: Option<String>,
    magnitude_baseline: Option<String>,
    systemic_context: Option<String>,
    why_strategic: String,
    tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CanonicalActorOutput {
    name: String,
    role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TimeSpanOutput {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

/// Step C output: macro link, comparables, abnormality — either read off
/// a high-confidence centroid match directly, or produced by the
/// macro-link-assessment LLM call for a medium-confidence one.
#[derive(Debug, Clone, Default, Deserialize)]
struct StepCOutput {
    macro_link: Option<String>,
    comparables: Vec<String>,
    abnormality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct StepDOutput {
    summary: String,
}

pub struct EnrichmentProcessor {
    llm: Arc<dyn LlmClient>,
    centroids: Arc<dyn CentroidStore>,
    efs: Arc<dyn EventFamilyStore>,
    titles: Arc<dyn TitleStore>,
    matcher: CentroidMatcher,
    config: EnrichmentConfig,
}

impl EnrichmentProcessor {
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        centroids: Arc<dyn CentroidStore>,
        efs: Arc<dyn EventFamilyStore>,
        titles: Arc<dyn TitleStore>,
        matcher_config: crate::config::CentroidMatcherConfig,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            llm,
            centroids,
            efs,
            titles,
            matcher: CentroidMatcher::new(matcher_config),
            config,
        }
    }

    /// Run Steps A-E in order and persist the result, leaving the EF
    /// active if every step succeeds (spec §4.6). A step that produces a
    /// validation failure surfaces as `Err` without partially persisting
    /// the EF — the runner is responsible for per-item skip-and-continue.
    pub async fn enrich(&self, mut ef: EventFamily) -> Result<EventFamily> {
        let members = self.titles.get_titles(&ef.source_title_ids).await?;

        let step_a = match self.step_a(&ef, &members).await {
            Ok(out) => out,
            // A failed Step A aborts the EF with status unchanged.
            Err(e) => return Err(e),
        };

        let member_texts: Vec<&str> = members.iter().map(|t| t.display_text.as_str()).collect();
        let magnitudes = extract_magnitudes(&member_texts);

        ef.enrichment = Some(EnrichmentPayload {
            canonical_actors: step_a.canonical_actors,
            policy_status: step_a.policy_status,
            time_span: Some((
                step_a.time_span.start.unwrap_or(ef.event_start),
                step_a.time_span.end.or(ef.event_end),
            )),
            temporal_pattern: step_a.temporal_pattern,
            magnitude_baseline: step_a.magnitude_baseline,
            systemic_context: step_a.systemic_context,
            magnitudes,
            official_sources: Vec::new(),
            why_strategic: Some(step_a.why_strategic),
        });
        ef.tags = step_a.tags;

        // A failed Step C downgrades to empty ef_context and proceeds to
        // Step D's deterministic branch.
        let step_c = self.step_c(&ef).await.unwrap_or_default();
        ef.context = EfContext {
            macro_link: step_c.macro_link,
            comparables: step_c.comparables,
            abnormality: step_c.abnormality,
        };
        ef.ctm_id = self.centroid_link(&ef).await?;

        // A failed Step D keeps the original EF summary.
        if ef.context.is_non_trivial() {
            if let Ok(rewritten) = self.step_d(&ef).await {
                ef.summary = rewritten.summary;
            }
        } else {
            ef.summary = deterministic_summary(&ef);
        }

        ef.activate().map_err(PipelineError::InvariantViolation)?;

        self.efs.update_ef(&ef).await?;
        Ok(ef)
    }

    async fn step_a(&self, ef: &EventFamily, members: &[crate::domain::Title]) -> Result<ResolvedStepA> {
        let mut recent: Vec<&crate::domain::Title> = members.iter().collect();
        recent.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        recent.truncate(self.config.recent_titles_for_step_a);
        let mut recent_lines = String::new();
        for t in &recent {
            recent_lines.push_str(&format!("- {}\n", t.display_text));
        }

        let prompt = format!(
            "Event: {}\nEvent type: {}\nTheater: {}\nSummary: {}\nRecent member headlines:\n{recent_lines}\n\n\
Identify the canonical actors (name + role: initiator/target/beneficiary/mediator), the \
policy lifecycle status (one of proposed/announced/enacted/in_force/suspended/rescinded/\
under_review/expired if applicable, else null), a time_span {{start, end}} (ISO-8601, end \
may be null), a short temporal_pattern description, a magnitude_baseline sentence, a \
systemic_context sentence, a why_strategic sentence, and exactly 3 tags (2 thematic, 1 \
geographic). Respond as JSON: {{\"canonical_actors\": [{{\"name\":..,\"role\":..}}], \
\"policy_status\": .. or null, \"time_span\": {{\"start\":.., \"end\": .. or null}}, \
\"temporal_pattern\": .. or null, \"magnitude_baseline\": .. or null, \
\"systemic_context\": .. or null, \"why_strategic\": .., \"tags\": [t1, t2, t3]}}",
            ef.title, ef.event_type, ef.primary_theater, ef.summary
        );
        let value = self.complete_json_validated(&prompt).await?;
        let raw: StepAOutput = serde_json::from_value(value)
            .map_err(|e| PipelineError::LlmMalformed(format!("step A schema mismatch: {e}")))?;

        if raw.tags.len() != crate::domain::event_family::REQUIRED_TAG_COUNT {
            return Err(PipelineError::Validation(format!(
                "step A produced {} tags, expected exactly {}",
                raw.tags.len(),
                crate::domain::event_family::REQUIRED_TAG_COUNT
            )));
        }

        let mut canonical_actors = Vec::with_capacity(raw.canonical_actors.len());
        for a in &raw.canonical_actors {
            let role = parse_actor_role(&a.role).ok_or_else(|| {
                PipelineError::Validation(format!("step A: unknown actor role {}", a.role))
            })?;
            canonical_actors.push(CanonicalActor {
                name: a.name.clone(),
                role,
            });
        }

        let policy_status = match &raw.policy_status {
            Some(s) => Some(parse_policy_status(s).ok_or_else(|| {
                PipelineError::Validation(format!("step A: unknown policy_status {s}"))
            })?),
            None => None,
        };

        Ok(ResolvedStepA {
            canonical_actors,
            policy_status,
            time_span: raw.time_span,
            temporal_pattern: raw.temporal_pattern,
            magnitude_baseline: raw.magnitude_baseline,
            systemic_context: raw.systemic_context,
            why_strategic: raw.why_strategic,
            tags: raw.tags,
        })
    }

    /// Ask C7 for the top-5 centroid candidates. A high-confidence match
    /// (composite ≥ floor) sets macro_link with no LLM call. A
    /// medium-confidence one spends the second call on a macro-link
    /// assessment over those candidates. Anything lower skips Step C
    /// entirely (empty context).
    async fn step_c(&self, ef: &EventFamily) -> Result<StepCOutput> {
        let centroids = self.centroids.load_all().await?;
        if centroids.is_empty() {
            return Ok(StepCOutput::default());
        }
        let top5 = self.matcher.top_candidates(&centroids, ef, 5);
        let Some(best) = top5.first() else {
            return Ok(StepCOutput::default());
        };
        match best.confidence {
            crate::centroid_matcher::Confidence::High => {
                return Ok(StepCOutput {
                    macro_link: Some(best.centroid.id.clone()),
                    ..Default::default()
                });
            }
            crate::centroid_matcher::Confidence::Low => return Ok(StepCOutput::default()),
            crate::centroid_matcher::Confidence::Medium => {}
        }

        let mut candidates = String::new();
        for m in &top5 {
            candidates.push_str(&format!(
                "- {} (composite {:.2}, keyword {:.2}, actor {:.2}, theater {:.2})\n",
                m.centroid.id, m.composite, m.keyword_score, m.actor_score, m.theater_score
            ));
        }
        let prompt = format!(
            "Event: {}\nSummary: {}\n\nTop-5 candidate macro-trend centroids:\n{candidates}\n\n\
Decide whether this Event Family belongs to one of these macro trends, and provide up to 3 \
comparable historical events (recent precedents with similar actors, not famous analogies) \
and an abnormality note (what about this event is unusual, or null). Respond as JSON: \
{{\"macro_link\": .. or null, \"comparables\": [...], \"abnormality\": .. or null}}",
            ef.title, ef.summary
        );
        let value = self.complete_json_validated(&prompt).await?;
        let raw: StepCOutput = serde_json::from_value(value)
            .map_err(|e| PipelineError::LlmMalformed(format!("step C schema mismatch: {e}")))?;

        if raw.comparables.len() > crate::domain::event_family::MAX_COMPARABLES {
            return Err(PipelineError::Validation(format!(
                "step C produced {} comparables, max is {}",
                raw.comparables.len(),
                crate::domain::event_family::MAX_COMPARABLES
            )));
        }
        Ok(raw)
    }

    /// Resolve a `ctm_id` from the same centroid match already scored in
    /// Step C, rather than rescoring — a high-confidence composite there
    /// is exactly this auto-link condition (spec §4.7 confidence bands).
    async fn centroid_link(&self, ef: &EventFamily) -> Result<Option<CtmId>> {
        let Some(centroid_id) = &ef.context.macro_link else {
            return Ok(None);
        };
        let month = ef
            .event_start
            .date_naive()
            .with_day(1)
            .unwrap_or_else(|| ef.event_start.date_naive());
        Ok(Some(CtmId {
            centroid_id: centroid_id.clone(),
            track: ef.event_type.clone(),
            month,
        }))
    }

    async fn step_d(&self, ef: &EventFamily) -> Result<StepDOutput> {
        let prompt = format!(
            "Event: {}\nCurrent summary: {}\nMacro link: {:?}\nComparables: {:?}\nAbnormality: {:?}\n\n\
Rewrite the summary in a strategic-intelligence voice, {}-{} words, incorporating the \
macro link and comparables above. Respond as JSON: {{\"summary\": ..}}",
            ef.title,
            ef.summary,
            ef.context.macro_link,
            ef.context.comparables,
            ef.context.abnormality,
            self.config.rewrite_min_words,
            self.config.rewrite_max_words,
        );
        let value = self.complete_json_validated(&prompt).await?;
        serde_json::from_value(value)
            .map_err(|e| PipelineError::LlmMalformed(format!("step D schema mismatch: {e}")))
    }

    async fn complete_json_validated(&self, prompt: &str) -> Result<serde_json::Value> {
        let opts = CompletionOptions::default().with_temperature(0.0);
        match self
            .llm
            .complete_json("You enrich a strategic Event Family. Respond with JSON only.", prompt, opts)
            .await?
        {
            JsonCompletion::Ok(v) => Ok(v),
            JsonCompletion::ParseError(raw) => Err(PipelineError::LlmMalformed(format!(
                "enrichment step response did not parse as JSON: {raw}"
            ))),
            JsonCompletion::SchemaError(raw) => Err(PipelineError::LlmMalformed(format!(
                "enrichment step response failed schema validation: {raw}"
            ))),
        }
    }
}

struct ResolvedStepA {
    canonical_actors: Vec<CanonicalActor>,
    policy_status: Option<PolicyStatus>,
    time_span: TimeSpanOutput,
    temporal_pattern: Option<String>,
    magnitude_baseline: Option<String>,
    systemic_context: Option<String>,
    why_strategic: String,
    tags: Vec<String>,
}

/// Step D's fallback: a template composed straight from Step A's fields,
/// used whenever Step C produced no macro link, comparables, or
/// abnormality note worth spending a rewrite call on.
fn deterministic_summary(ef: &EventFamily) -> String {
    let Some(payload) = &ef.enrichment else {
        return ef.summary.clone();
    };
    let actors = payload
        .canonical_actors
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut parts = vec![ef.summary.clone()];
    if !actors.is_empty() {
        parts.push(format!("Key actors: {actors}."));
    }
    if let Some(baseline) = &payload.magnitude_baseline {
        parts.push(baseline.clone());
    }
    if let Some(context) = &payload.systemic_context {
        parts.push(context.clone());
    }
    parts.join(" ")
}

fn parse_actor_role(raw: &str) -> Option<ActorRole> {
    match raw.to_lowercase().as_str() {
        "initiator" => Some(ActorRole::Initiator),
        "target" => Some(ActorRole::Target),
        "beneficiary" => Some(ActorRole::Beneficiary),
        "mediator" => Some(ActorRole::Mediator),
        _ => None,
    }
}

fn parse_policy_status(raw: &str) -> Option<PolicyStatus> {
    match raw.to_lowercase().as_str() {
        "proposed" => Some(PolicyStatus::Proposed),
        "announced" => Some(PolicyStatus::Announced),
        "enacted" => Some(PolicyStatus::Enacted),
        "in_force" => Some(PolicyStatus::InForce),
        "suspended" => Some(PolicyStatus::Suspended),
        "rescinded" => Some(PolicyStatus::Rescinded),
        "under_review" => Some(PolicyStatus::UnderReview),
        "expired" => Some(PolicyStatus::Expired),
        _ => None,
    }
}

/// One regex family per magnitude kind (spec §4.6 Step B): captures a
/// numeric value, an optional scale word, and a unit/keyword.
static MAGNITUDE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "money",
            Regex::new(r"(?i)[$€£]\s?([\d,]+(?:\.\d+)?)\s?(billion|million|thousand|bn|m|k)?\b")
                .unwrap(),
        ),
        (
            "energy",
            Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s?(megawatts?|gigawatts?|terawatt-?hours?|barrels?(?:\s+of\s+oil)?)")
                .unwrap(),
        ),
        (
            "military",
            Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s?(troops|soldiers|tanks|aircraft|warships)")
                .unwrap(),
        ),
        (
            "casualties",
            Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s?(killed|wounded|dead|casualties|injured)")
                .unwrap(),
        ),
        (
            "percentage",
            Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s?(%|percent)").unwrap(),
        ),
        (
            "trade",
            Regex::new(r"(?i)([\d,]+(?:\.\d+)?)\s?(tons|tonnes|exports|imports)").unwrap(),
        ),
    ]
});

/// Step B: no LLM. Scans every member-title text against the six regex
/// families, normalizes scale words to a base unit, dedupes by (rounded
/// value, unit), caps at [`crate::domain::event_family::MAX_MAGNITUDES`].
#[must_use]
pub fn extract_magnitudes(texts: &[&str]) -> Vec<Magnitude> {
    let mut found = Vec::new();
    let mut seen: HashSet<(i64, String)> = HashSet::new();

    'texts: for text in texts {
        for (_family, re) in MAGNITUDE_PATTERNS.iter() {
            for cap in re.captures_iter(text) {
                let Some(raw_value) = cap.get(1) else { continue };
                let Ok(parsed) = raw_value.as_str().replace(',', "").parse::<f64>() else {
                    continue;
                };
                let scale = cap.get(2).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
                let value = apply_scale(parsed, &scale);
                let unit = normalize_unit(&scale);
                let key = (value.round() as i64, unit.clone());
                if seen.insert(key) {
                    found.push(Magnitude {
                        value,
                        unit,
                        raw_text: cap.get(0).unwrap().as_str().to_string(),
                    });
                }
                if found.len() >= crate::domain::event_family::MAX_MAGNITUDES {
                    break 'texts;
                }
            }
        }
    }
    found.truncate(crate::domain::event_family::MAX_MAGNITUDES);
    found
}

fn apply_scale(value: f64, scale: &str) -> f64 {
    match scale {
        "billion" | "bn" => value * 1_000_000_000.0,
        "million" | "m" => value * 1_000_000.0,
        "thousand" | "k" => value * 1_000.0,
        _ => value,
    }
}

fn normalize_unit(scale: &str) -> String {
    match scale {
        "bn" => "billion".to_string(),
        "m" => "million".to_string(),
        "k" => "thousand".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Centroid, EfStatus, Entity, EntityType, EventFamilyId, Title, Verdict};
    use crate::traits::{ActionTriple, ChatMessage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct QueuedLlm {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for QueuedLlm {
        async fn complete(&self, _s: &str, _u: &str, _o: CompletionOptions) -> Result<String> {
            unimplemented!()
        }
        async fn complete_json(
            &self,
            _s: &str,
            _u: &str,
            _o: CompletionOptions,
        ) -> Result<JsonCompletion> {
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .expect("no queued response left");
            match serde_json::from_str(&next) {
                Ok(v) => Ok(JsonCompletion::Ok(v)),
                Err(e) => Ok(JsonCompletion::ParseError(e.to_string())),
            }
        }
        async fn chat_completion(
            &self,
            _m: &[ChatMessage],
            _o: CompletionOptions,
        ) -> Result<String> {
            unimplemented!()
        }
    }

    struct FakeCentroidStore {
        centroids: Vec<Centroid>,
    }

    #[async_trait]
    impl CentroidStore for FakeCentroidStore {
        async fn load_all(&self) -> Result<Vec<Centroid>> {
            Ok(self.centroids.clone())
        }
    }

    struct FakeEfStore {
        updated: Mutex<Vec<EventFamily>>,
    }

    #[async_trait]
    impl EventFamilyStore for FakeEfStore {
        async fn create_ef(&self, _ef: &EventFamily) -> Result<()> {
            Ok(())
        }
        async fn get_ef(&self, _id: EventFamilyId) -> Result<Option<EventFamily>> {
            Ok(None)
        }
        async fn update_ef(&self, ef: &EventFamily) -> Result<()> {
            self.updated.lock().unwrap().push(ef.clone());
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

    struct FakeTitleStore {
        titles: Vec<Title>,
    }

    #[async_trait]
    impl TitleStore for FakeTitleStore {
        async fn upsert_title(&self, _record: &Title) -> Result<()> {
            Ok(())
        }
        async fn mark_verdict(
            &self,
            _id: crate::domain::TitleId,
            _verdict: Verdict,
            _reason: &str,
            _entities: Vec<Entity>,
            _triple: Option<ActionTriple>,
        ) -> Result<()> {
            Ok(())
        }
        async fn assign_to_ef(
            &self,
            _ids: &[crate::domain::TitleId],
            _ef_id: EventFamilyId,
            _confidence: f64,
            _rationale: &str,
        ) -> Result<usize> {
            Ok(0)
        }
        async fn load_unassigned_strategic(
            &self,
            _limit: usize,
            _order: crate::traits::SortOrder,
        ) -> Result<Vec<Title>> {
            Ok(vec![])
        }
        async fn load_unfiltered(&self, _limit: usize) -> Result<Vec<Title>> {
            Ok(vec![])
        }
        async fn get_title(&self, id: crate::domain::TitleId) -> Result<Option<Title>> {
            Ok(self.titles.iter().find(|t| t.id == id).cloned())
        }
        async fn get_titles(&self, ids: &[crate::domain::TitleId]) -> Result<Vec<Title>> {
            Ok(self
                .titles
                .iter()
                .filter(|t| ids.contains(&t.id))
                .cloned()
                .collect())
        }
    }

    fn seed_ef(member_ids: Vec<crate::domain::TitleId>) -> EventFamily {
        EventFamily {
            id: EventFamilyId::new(),
            title: "US sanctions Iran".into(),
            summary: "The US imposed new sanctions on Iran's central bank.".into(),
            key_actors: vec!["United States".into(), "Iran".into()],
            event_type: "sanctions".into(),
            primary_theater: "Middle East".into(),
            event_start: chrono::Utc::now(),
            event_end: None,
            source_title_ids: member_ids,
            confidence: 0.8,
            coherence_rationale: "shared actor".into(),
            status: EfStatus::Seed,
            tags: vec![],
            context: EfContext::default(),
            enrichment: None,
            ctm_id: None,
        }
    }

    fn member_title(text: &str) -> Title {
        Title::new(text, text, "Reuters", chrono::Utc::now(), "en")
    }

    #[tokio::test]
    async fn full_enrichment_activates_the_ef_with_a_single_llm_call() {
        let member = member_title("US Treasury imposes $500 million in sanctions on Iran");
        let ef = seed_ef(vec![member.id]);

        // No centroid configured, so Step C short-circuits to empty
        // context with no LLM call: only Step A's call is queued.
        let responses = vec![
            r#"{"canonical_actors":[{"name":"United States","role":"initiator"},{"name":"Iran","role":"target"}],"policy_status":"enacted","time_span":{"start":"2026-01-01T00:00:00Z","end":null},"temporal_pattern":"single action","magnitude_baseline":"comparable to prior rounds","systemic_context":"part of a broader pressure campaign","why_strategic":"escalates economic pressure on a strategic adversary","tags":["sanctions","iran","finance"]}"#
                .to_string(),
        ];
        let llm = Arc::new(QueuedLlm {
            responses: Mutex::new(responses),
        });
        let centroids = Arc::new(FakeCentroidStore { centroids: vec![] });
        let efs = Arc::new(FakeEfStore {
            updated: Mutex::new(vec![]),
        });
        let titles = Arc::new(FakeTitleStore {
            titles: vec![member],
        });
        let processor = EnrichmentProcessor::new(
            llm,
            centroids,
            efs.clone(),
            titles,
            crate::config::CentroidMatcherConfig::default(),
            EnrichmentConfig::default(),
        );

        let result = processor.enrich(ef).await.unwrap();
        assert_eq!(result.status, EfStatus::Active);
        assert_eq!(result.tags.len(), 3);
        assert!(result.enrichment.is_some());
        assert_eq!(result.enrichment.as_ref().unwrap().magnitudes.len(), 1);
        assert_eq!(result.enrichment.as_ref().unwrap().magnitudes[0].unit, "million");
        assert!(!result.context.is_non_trivial());
        assert_eq!(result.summary, deterministic_summary(&result));
        assert_eq!(efs.updated.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_tag_count_fails_validation_without_activating() {
        let member = member_title("A headline with no magnitudes in it");
        let ef = seed_ef(vec![member.id]);
        let responses = vec![
            r#"{"canonical_actors":[],"policy_status":null,"time_span":{"start":null,"end":null},"temporal_pattern":null,"magnitude_baseline":null,"systemic_context":null,"why_strategic":"x","tags":["only","two"]}"#
                .to_string(),
        ];
        let llm = Arc::new(QueuedLlm {
            responses: Mutex::new(responses),
        });
        let centroids = Arc::new(FakeCentroidStore { centroids: vec![] });
        let efs = Arc::new(FakeEfStore {
            updated: Mutex::new(vec![]),
        });
        let titles = Arc::new(FakeTitleStore {
            titles: vec![member],
        });
        let processor = EnrichmentProcessor::new(
            llm,
            centroids,
            efs,
            titles,
            crate::config::CentroidMatcherConfig::default(),
            EnrichmentConfig::default(),
        );

        let err = processor.enrich(ef).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn regex_pass_extracts_normalizes_and_dedupes_money() {
        let texts = vec![
            "The deal is worth $1.5 billion over five years",
            "Sources put the figure at $1,500,000,000 in total",
            "Separately, 200 troops were deployed",
        ];
        let magnitudes = extract_magnitudes(&texts);
        assert_eq!(magnitudes.len(), 2);
        let money = magnitudes.iter().find(|m| m.unit == "billion").unwrap();
        assert!((money.value - 1_500_000_000.0).abs() < 1.0);
        assert!(magnitudes.iter().any(|m| m.unit == "troops"));
    }

    #[test]
    fn regex_pass_caps_at_max_magnitudes() {
        let texts = vec!["$1 million, $2 million, $3 million, $4 million spent across four deals"];
        let magnitudes = extract_magnitudes(&texts);
        assert_eq!(
            magnitudes.len(),
            crate::domain::event_family::MAX_MAGNITUDES
        );
    }
}
