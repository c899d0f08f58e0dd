//! C8: narrative frame extractor (spec §4.8).
//!
//! Discovery (Pass 1) asks the LLM to propose a small set of candidate
//! framings (each a label + moral_frame + description) over a sampled set
//! of titles. At Epic scope, where discovery only ever sees a sparse
//! sample of a much larger set, a second classification pass (Pass 2)
//! assigns every title in the full set into zero-or-one of those frames
//! in batches. At Event and Ctm scope the sample already covers (or
//! nearly covers) the whole title set, so discovery assigns titles
//! directly via `title_indices` and no second pass runs. Aggregation then
//! computes each frame's top sources, over-indexed ("proportional")
//! sources, and top countries. Grounded in the two-pass discovery/
//! classification split described for narrative extraction in
//! `original_source/apps/gen1/` (see `_INDEX.md`).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::NarrativeConfig;
use crate::domain::{
    CountryShare, NarrativeEntityType, NarrativeFrame, SourceShare, Title, TitleId,
};
use crate::error::{PipelineError, Result};
use crate::traits::{CompletionOptions, JsonCompletion, LlmClient, NarrativeStore};

#[derive(Debug, Clone, Deserialize)]
struct DiscoveredFrame {
    label: String,
    description: String,
    moral_frame: String,
    /// Indices into the sample passed to discovery, present only for
    /// Event/Ctm scope where discovery assigns titles directly and no
    /// second classification pass runs.
    #[serde(default)]
    title_indices: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscoveryResponse {
    frames: Vec<DiscoveredFrame>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassifiedTitle {
    title_id: String,
    label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClassificationResponse {
    classifications: Vec<ClassifiedTitle>,
}

pub struct NarrativeExtractor {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn NarrativeStore>,
    config: NarrativeConfig,
}

impl NarrativeExtractor {
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn NarrativeStore>, config: NarrativeConfig) -> Self {
        Self { llm, store, config }
    }

    /// Run both passes plus aggregation for one entity and atomically
    /// replace its stored frames (spec §4.8, §8 idempotence).
    pub async fn extract(
        &self,
        entity_type: NarrativeEntityType,
        entity_id: &str,
        titles: &[Title],
    ) -> Result<Vec<NarrativeFrame>> {
        let (min_frames, max_frames, sample_cap) = match entity_type {
            NarrativeEntityType::Event => (
                self.config.event_min_frames,
                self.config.event_max_frames,
                titles.len(),
            ),
            NarrativeEntityType::Ctm | NarrativeEntityType::Epic => (
                self.config.ctm_epic_min_frames,
                self.config.ctm_epic_max_frames,
                if entity_type == NarrativeEntityType::Ctm {
                    self.config.ctm_sample_cap
                } else {
                    self.config.epic_sample_cap
                },
            ),
        };

        let sample = sample_titles(titles, sample_cap);
        let discovered = self
            .discover_frames(entity_type, &sample, min_frames, max_frames)
            .await?;

        // Pass 2 (separate classification call over the full title set) only
        // earns its keep at epic scale, where discovery only ever sees a
        // sparse sample. For Event and Ctm scope the sample already covers
        // (or nearly covers) every title, so discovery returns each title's
        // frame assignment directly via `title_indices` and a second LLM
        // call would just be re-asking a question already answered.
        let (assignments, global_counts, total_classified) = if entity_type == NarrativeEntityType::Epic
        {
            let mut assignments: HashMap<String, Vec<&Title>> = HashMap::new();
            for chunk in titles.chunks(self.config.classification_batch_size.max(1)) {
                let classified = self.classify_batch(chunk, &discovered).await?;
                for c in classified.classifications {
                    let Some(label) = c.label else { continue };
                    if !discovered.iter().any(|f| f.label == label) {
                        continue;
                    }
                    let Ok(id) = uuid::Uuid::parse_str(&c.title_id) else {
                        continue;
                    };
                    if let Some(title) = chunk.iter().find(|t| t.id == crate::domain::TitleId(id)) {
                        assignments.entry(label).or_default().push(title);
                    }
                }
            }
            (assignments, publisher_counts(titles), titles.len())
        } else {
            let mut assignments: HashMap<String, Vec<&Title>> = HashMap::new();
            for frame_def in &discovered {
                let Some(indices) = &frame_def.title_indices else {
                    continue;
                };
                for &idx in indices {
                    if let Some(title) = sample.get(idx) {
                        assignments.entry(frame_def.label.clone()).or_default().push(*title);
                    }
                }
            }
            (
                assignments,
                publisher_counts(sample.iter().copied()),
                sample.len(),
            )
        };

        let mut frames = Vec::with_capacity(discovered.len());
        for frame_def in &discovered {
            let Some(members) = assignments.get(&frame_def.label) else {
                continue;
            };
            if members.is_empty() {
                continue;
            }
            frames.push(self.build_frame(
                entity_type,
                entity_id,
                frame_def,
                members,
                &global_counts,
                total_classified,
            ));
        }

        self.store
            .replace_frames(entity_type, entity_id, frames.clone())
            .await?;
        Ok(frames)
    }

    async fn discover_frames(
        &self,
        entity_type: NarrativeEntityType,
        sample: &[&Title],
        min_frames: usize,
        max_frames: usize,
    ) -> Result<Vec<DiscoveredFrame>> {
        let mut lines = String::new();
        for (i, t) in sample.iter().enumerate() {
            lines.push_str(&format!("{i}: {}\n", t.display_text));
        }
        let prompt = if entity_type == NarrativeEntityType::Epic {
            format!(
                "Read these headlines about the same underlying story and propose between \
{min_frames} and {max_frames} distinct narrative framings (how different sources \
characterize the same events). For each: a short label, a one-sentence description, \
and a moral_frame (the implicit value judgment, e.g. \"defensive necessity\" vs \
\"aggressive escalation\"). Respond as JSON: {{\"frames\": [{{\"label\":..,\
\"description\":..,\"moral_frame\":..}}]}}\n\nHeadlines:\n{lines}"
            )
        } else {
            format!(
                "Read these headlines (each prefixed by its index) about the same underlying \
story and propose between {min_frames} and {max_frames} distinct narrative framings (how \
different sources characterize the same events). For each: a short label, a one-sentence \
description, a moral_frame (the implicit value judgment, e.g. \"defensive necessity\" vs \
\"aggressive escalation\"), and title_indices: the indices of every headline above that \
fits this framing. Every headline must be assigned to at most one frame. Respond as JSON: \
{{\"frames\": [{{\"label\":..,\"description\":..,\"moral_frame\":..,\"title_indices\":[..]}}]}}\
\n\nHeadlines:\n{lines}"
            )
        };
        let opts = CompletionOptions::default().with_temperature(0.3);
        let value = self.complete_json(&prompt, opts).await?;
        let parsed: DiscoveryResponse = serde_json::from_value(value)
            .map_err(|e| PipelineError::LlmMalformed(format!("discovery schema mismatch: {e}")))?;

        if parsed.frames.len() < min_frames {
            return Err(PipelineError::Validation(format!(
                "discovery produced {} frames, need at least {min_frames}",
                parsed.frames.len()
            )));
        }
        let mut frames = parsed.frames;
        frames.truncate(max_frames);
        Ok(frames)
    }

    async fn classify_batch(
        &self,
        batch: &[Title],
        frames: &[DiscoveredFrame],
    ) -> Result<ClassificationResponse> {
        let labels: Vec<&str> = frames.iter().map(|f| f.label.as_str()).collect();
        let mut lines = String::new();
        for t in batch {
            lines.push_str(&format!("{} :: {}\n", t.id, t.display_text));
        }
        let prompt = format!(
            "Classify each headline (id :: text) into exactly one of these frame labels: \
{labels:?}, or null if none fit. Respond as JSON: \
{{\"classifications\": [{{\"title_id\": .., \"label\": .. or null}}]}}\n\nHeadlines:\n{lines}"
        );
        let opts = CompletionOptions::default().with_temperature(0.1);
        let value = self.complete_json(&prompt, opts).await?;
        serde_json::from_value(value)
            .map_err(|e| PipelineError::LlmMalformed(format!("classification schema mismatch: {e}")))
    }

    async fn complete_json(&self, prompt: &str, opts: CompletionOptions) -> Result<serde_json::Value> {
        match self
            .llm
            .complete_json(
                "You analyze how news sources frame the same story. Respond with JSON only.",
                prompt,
                opts,
            )
            .await?
        {
            JsonCompletion::Ok(v) => Ok(v),
            JsonCompletion::ParseError(raw) => Err(PipelineError::LlmMalformed(format!(
                "narrative extraction response did not parse as JSON: {raw}"
            ))),
            JsonCompletion::SchemaError(raw) => Err(PipelineError::LlmMalformed(format!(
                "narrative extraction response failed schema validation: {raw}"
            ))),
        }
    }

    fn build_frame(
        &self,
        entity_type: NarrativeEntityType,
        entity_id: &str,
        frame_def: &DiscoveredFrame,
        members: &[&Title],
        global_counts: &HashMap<String, u32>,
        total_classified: usize,
    ) -> NarrativeFrame {
        let mut per_publisher: HashMap<String, u32> = HashMap::new();
        let mut per_country: HashMap<String, u32> = HashMap::new();
        for t in members {
            *per_publisher.entry(t.publisher.clone()).or_insert(0) += 1;
            if let Some(code) = &t.iso_country {
                *per_country.entry(code.clone()).or_insert(0) += 1;
            }
        }

        let mut shares: Vec<SourceShare> = per_publisher
            .into_iter()
            .filter(|(_, count)| *count >= self.config.min_titles_per_publisher_per_frame)
            .map(|(publisher, frame_count)| {
                let global_count = *global_counts.get(&publisher).unwrap_or(&frame_count);
                let share_in_frame = frame_count as f64 / members.len() as f64;
                let share_in_epic = global_count as f64 / total_classified.max(1) as f64;
                let over_index = if share_in_epic == 0.0 {
                    0.0
                } else {
                    share_in_frame / share_in_epic
                };
                SourceShare {
                    publisher,
                    frame_count,
                    global_count,
                    over_index,
                }
            })
            .collect();
        shares.sort_by(|a, b| b.frame_count.cmp(&a.frame_count));
        shares.truncate(crate::domain::narrative::MAX_TOP_SOURCES);

        let mut proportional: Vec<SourceShare> = shares
            .iter()
            .filter(|s| {
                s.global_count >= self.config.proportional_min_global_count as u32
                    && s.over_index >= self.config.top_source_over_index_floor
            })
            .cloned()
            .collect();
        proportional.truncate(crate::domain::narrative::MAX_PROPORTIONAL_SOURCES);

        let mut countries: Vec<CountryShare> = per_country
            .into_iter()
            .map(|(iso_code, count)| CountryShare { iso_code, count })
            .collect();
        countries.sort_by(|a, b| b.count.cmp(&a.count));
        countries.truncate(crate::domain::narrative::MAX_TOP_COUNTRIES);

        let sample_titles: Vec<TitleId> = members
            .iter()
            .take(crate::domain::narrative::MAX_SAMPLE_TITLES)
            .map(|t| t.id)
            .collect();

        NarrativeFrame {
            entity_type,
            entity_id: entity_id.to_string(),
            label: frame_def.label.clone(),
            description: frame_def.description.clone(),
            moral_frame: frame_def.moral_frame.clone(),
            title_count: members.len() as u32,
            top_sources: shares,
            proportional_sources: proportional,
            top_countries: countries,
            sample_titles,
        }
    }
}

/// Deterministic down-sample: every `step`-th title, capped at `cap`, so
/// discovery sees a spread across the full set rather than only its head.
fn sample_titles<'a>(titles: &'a [Title], cap: usize) -> Vec<&'a Title> {
    if titles.len() <= cap {
        return titles.iter().collect();
    }
    let step = (titles.len() as f64 / cap as f64).ceil() as usize;
    titles.iter().step_by(step.max(1)).take(cap).collect()
}

fn publisher_counts<'a>(titles: impl IntoIterator<Item = &'a Title>) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for t in titles {
        *counts.entry(t.publisher.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
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
            Ok(JsonCompletion::Ok(serde_json::from_str(&next).unwrap()))
        }
        async fn chat_completion(
            &self,
            _m: &[crate::traits::ChatMessage],
            _o: CompletionOptions,
        ) -> Result<String> {
            unimplemented!()
        }
    }

    struct FakeNarrativeStore {
        saved: Mutex<Vec<NarrativeFrame>>,
    }

    #[async_trait]
    impl NarrativeStore for FakeNarrativeStore {
        async fn replace_frames(
            &self,
            _entity_type: NarrativeEntityType,
            _entity_id: &str,
            frames: Vec<NarrativeFrame>,
        ) -> Result<()> {
            *self.saved.lock().unwrap() = frames;
            Ok(())
        }
        async fn load_frames(
            &self,
            _entity_type: NarrativeEntityType,
            _entity_id: &str,
        ) -> Result<Vec<NarrativeFrame>> {
            Ok(self.saved.lock().unwrap().clone())
        }
    }

    fn title(publisher: &str, id: TitleId) -> Title {
        let mut t = Title::new("headline", "headline", publisher, Utc::now(), "en");
        t.id = id;
        t
    }

    #[tokio::test]
    async fn epic_scope_runs_a_second_classification_pass() {
        let t1 = title("Reuters", TitleId::new());
        let t2 = title("Reuters", TitleId::new());
        let t3 = title("AP", TitleId::new());

        let classification = format!(
            r#"{{"classifications": [{{"title_id": "{}", "label": "defensive"}}, {{"title_id": "{}", "label": "defensive"}}, {{"title_id": "{}", "label": "offensive"}}]}}"#,
            t1.id, t2.id, t3.id
        );
        let discovery = r#"{"frames": [{"label": "defensive", "description": "d", "moral_frame": "necessity"}, {"label": "offensive", "description": "o", "moral_frame": "escalation"}]}"#.to_string();

        let llm = Arc::new(QueuedLlm {
            responses: Mutex::new(vec![classification, discovery]),
        });
        let store = Arc::new(FakeNarrativeStore {
            saved: Mutex::new(vec![]),
        });
        let mut config = NarrativeConfig::default();
        config.min_titles_per_publisher_per_frame = 1;
        let extractor = NarrativeExtractor::new(llm, store.clone(), config);

        let titles = vec![t1.clone(), t2.clone(), t3.clone()];
        let frames = extractor
            .extract(NarrativeEntityType::Epic, "epic-1", &titles)
            .await
            .unwrap();

        assert_eq!(frames.len(), 2);
        let defensive = frames.iter().find(|f| f.label == "defensive").unwrap();
        assert_eq!(defensive.title_count, 2);
        assert_eq!(store.saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn event_scope_assigns_titles_from_discovery_without_a_second_pass() {
        let t1 = title("Reuters", TitleId::new());
        let t2 = title("Reuters", TitleId::new());
        let t3 = title("AP", TitleId::new());

        // Only one queued response: discovery itself carries title_indices,
        // so no classify_batch call (and no second queued response) happens
        // for Event scope.
        let discovery = r#"{"frames": [{"label": "defensive", "description": "d", "moral_frame": "necessity", "title_indices": [0, 1]}, {"label": "offensive", "description": "o", "moral_frame": "escalation", "title_indices": [2]}]}"#.to_string();

        let llm = Arc::new(QueuedLlm {
            responses: Mutex::new(vec![discovery]),
        });
        let store = Arc::new(FakeNarrativeStore {
            saved: Mutex::new(vec![]),
        });
        let mut config = NarrativeConfig::default();
        config.min_titles_per_publisher_per_frame = 1;
        let extractor = NarrativeExtractor::new(llm, store.clone(), config);

        let titles = vec![t1.clone(), t2.clone(), t3.clone()];
        let frames = extractor
            .extract(NarrativeEntityType::Event, "ef-1", &titles)
            .await
            .unwrap();

        assert_eq!(frames.len(), 2);
        let defensive = frames.iter().find(|f| f.label == "defensive").unwrap();
        assert_eq!(defensive.title_count, 2);
        assert_eq!(store.saved.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn too_few_discovered_frames_is_a_validation_error() {
        let t1 = title("Reuters", TitleId::new());
        let discovery = r#"{"frames": [{"label": "only_one", "description": "d", "moral_frame": "m"}]}"#.to_string();
        let llm = Arc::new(QueuedLlm {
            responses: Mutex::new(vec![discovery]),
        });
        let store = Arc::new(FakeNarrativeStore {
            saved: Mutex::new(vec![]),
        });
        let extractor = NarrativeExtractor::new(llm, store, NarrativeConfig::default());
        let err = extractor
            .extract(NarrativeEntityType::Event, "ef-1", &[t1])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
