//! End-to-end exercise of the pipeline across stage boundaries, against
//! the in-memory fakes in `fakes.rs`: P2 filter -> C2 sync -> C3
//! connectivity -> P3 assembly -> C6 enrichment -> C8 narrative
//! extraction. Each engine module's own unit tests cover its internal
//! branches in isolation; this file checks that the ports actually
//! compose the way spec §4/§8 describe (an EF assembled here is the one
//! C6 enriches, titles filtered here are the ones C3 scores).


use std::sync::Arc;

use chrono::Utc;

use arcline_core::assembler::EventFamilyAssembler;
use arcline_core::config::{
    CentroidMatcherConfig, ConnectivityConfig, EnrichmentConfig, NarrativeConfig, P2Config, P3Config,
};
use arcline_core::connectivity_cache::ConnectivityCacheBuilder;
use arcline_core::domain::{Entity, EntityType, NarrativeEntityType, Title, Verdict};
use arcline_core::filter::StrategicFilter;
use arcline_core::narrative_extractor::NarrativeExtractor;
use arcline_core::traits::SortOrder;

use fakes::{FakeConnectivityStore, FakeEfStore, FakeGraph, FakeLlm, FakeNarrativeStore, FakeTitleStore};

fn strategic_title(text: &str, entities: &[&str]) -> Title {
    let mut t = Title::new(text, text.to_lowercase(), "Reuters", Utc::now(), "en");
    t.entities = entities
        .iter()
        .map(|e| Entity {
            text: (*e).to_string(),
            entity_type: EntityType::Gpe,
        })
        .collect();
    t
}

#[tokio::test]
async fn filter_then_connectivity_scores_only_surviving_titles() {
    let strategic = strategic_title("US imposes new sanctions on Iran", &["united states", "iran"]);
    let strategic_twin = strategic_title("US expands Iran sanctions regime", &["united states", "iran"]);
    let junk = strategic_title("Celebrity horoscope for the week", &["horoscope"]);

    let graph = Arc::new(FakeGraph::default());
    let filter = StrategicFilter::new(graph.clone(), P2Config::default());

    let titles_store = Arc::new(FakeTitleStore::seeded(vec![
        strategic.clone(),
        strategic_twin.clone(),
        junk.clone(),
    ]));

    for title in [&strategic, &strategic_twin, &junk] {
        let verdict = filter
            .evaluate(title.id, &title.normalized_text, &title.entities)
            .await;
        let new_verdict = if verdict.keep {
            Verdict::Strategic
        } else {
            Verdict::NonStrategic
        };
        titles_store
            .mark_verdict(title.id, new_verdict, &verdict.reason, title.entities.clone(), None)
            .await
            .unwrap();
        let mut synced = title.clone();
        synced.verdict = new_verdict;
        graph.sync_title(&synced).await.unwrap();
    }

    let survivors = titles_store
        .load_unassigned_strategic(10, SortOrder::PublicationDescending)
        .await
        .unwrap();
    assert_eq!(survivors.len(), 2, "the junk headline must not survive P2");
    assert!(survivors.iter().all(|t| t.id != junk.id));

    let connectivity = Arc::new(FakeConnectivityStore::default());
    let cache = ConnectivityCacheBuilder::new(
        graph,
        titles_store,
        connectivity.clone(),
        ConnectivityConfig::default(),
    );
    let persisted = cache.refresh().await.unwrap();
    assert_eq!(persisted, 1, "the two sanctions headlines share both entities");
    assert_eq!(connectivity.count().await.unwrap(), 1);
}

#[tokio::test]
async fn assembly_then_enrichment_activates_an_ef_from_filtered_titles() {
    let t1 = strategic_title("US sanctions Iran central bank", &["united states", "iran"]);
    let t2 = strategic_title("US widens Iran sanctions", &["united states", "iran"]);

    let assemble_response = format!(
        r#"{{"families": [{{"member_title_ids": ["{}", "{}"], "title": "US sanctions Iran", "summary": "The US escalated economic pressure on Iran.", "event_type": "sanctions", "primary_theater": "middle_east", "confidence": 0.92, "rationale": "shared actor and action"}}]}}"#,
        t1.id, t2.id
    );
    // No centroid is configured below, so Step C short-circuits to empty
    // context with no LLM call and Step D falls to its deterministic
    // template: Step A's call is the only one queued.
    let enrich_responses = vec![
        r#"{"canonical_actors":[{"name":"United States","role":"initiator"},{"name":"Iran","role":"target"}],"policy_status":"enacted","time_span":{"start":null,"end":null},"temporal_pattern":"single action","magnitude_baseline":null,"systemic_context":null,"why_strategic":"escalates economic pressure on a strategic adversary","tags":["sanctions","iran","finance"]}"#,
    ];

    let titles_store = Arc::new(FakeTitleStore::seeded(vec![t1.clone(), t2.clone()]));
    let ef_store = Arc::new(FakeEfStore::default());
    let assemble_llm = Arc::new(FakeLlm::new(vec![assemble_response.as_str()]));

    let narrative_store = Arc::new(FakeNarrativeStore::default());
    let assembler = EventFamilyAssembler::new(
        titles_store.clone(),
        ef_store.clone(),
        assemble_llm,
        narrative_store,
        NarrativeConfig::default(),
        P3Config::default(),
    );
    let report = assembler.assemble_batch(&[t1.clone(), t2.clone()]).await.unwrap();
    assert_eq!(report.families_created, 1);
    assert_eq!(report.titles_assigned, 2);

    let seeds = ef_store.load_seed_efs(10).await.unwrap();
    assert_eq!(seeds.len(), 1);
    let seed_ef = seeds.into_iter().next().unwrap();
    assert_eq!(seed_ef.source_title_ids.len(), 2);

    let centroids = Arc::new(fakes::FakeCentroidStore::new(vec![]));
    let enrich_llm = Arc::new(FakeLlm::new(enrich_responses));
    let processor = arcline_core::enrichment::EnrichmentProcessor::new(
        enrich_llm,
        centroids,
        ef_store.clone(),
        titles_store.clone(),
        CentroidMatcherConfig::default(),
        EnrichmentConfig::default(),
    );
    let enriched = processor.enrich(seed_ef).await.unwrap();
    assert_eq!(enriched.status, arcline_core::domain::EfStatus::Active);
    assert_eq!(enriched.tags.len(), 3);
    assert!(enriched.satisfies_active_cardinality_bounds());

    let stored = ef_store.get_ef(enriched.id).await.unwrap().unwrap();
    assert_eq!(stored.status, arcline_core::domain::EfStatus::Active);
}

#[tokio::test]
async fn narrative_extraction_rejects_event_with_too_few_titles() {
    let t1 = strategic_title("A lone strategic headline", &["nato"]);

    let ef = arcline_core::domain::EventFamily {
        id: arcline_core::domain::EventFamilyId::new(),
        title: "t".into(),
        summary: "s".into(),
        key_actors: vec![],
        event_type: "e".into(),
        primary_theater: "t".into(),
        event_start: Utc::now(),
        event_end: None,
        source_title_ids: vec![t1.id],
        confidence: 0.5,
        coherence_rationale: "r".into(),
        status: arcline_core::domain::EfStatus::Active,
        tags: vec![],
        context: arcline_core::domain::EfContext::default(),
        enrichment: None,
        ctm_id: None,
    };

    let request = arcline_core::extract::ExtractRequest {
        entity_type: NarrativeEntityType::Event,
        entity_id: ef.id.to_string(),
    };
    let title_count = Some(ef.source_title_ids.len());
    let err = arcline_core::extract::validate_extract_request(&request, title_count, 20).unwrap_err();
    assert!(matches!(
        err,
        arcline_core::extract::ExtractValidationError::TooFewMemberTitles { actual: 1, minimum: 5, .. }
    ));
}

#[tokio::test]
async fn narrative_extraction_runs_end_to_end_once_validated() {
    let titles: Vec<Title> = (0..5)
        .map(|i| strategic_title(&format!("Strategic headline {i}"), &["nato"]))
        .collect();
    let title_ids: Vec<_> = titles.iter().map(|t| t.id).collect();

    let discovery = r#"{"frames":[
        {"label":"escalation","description":"framing as escalation","moral_frame":"threat"},
        {"label":"de-escalation","description":"framing as restraint","moral_frame":"prudence"}
    ]}"#;
    let classification = format!(
        r#"{{"classifications":[{}]}}"#,
        title_ids
            .iter()
            .map(|id| format!(r#"{{"title_id":"{id}","label":"escalation"}}"#))
            .collect::<Vec<_>>()
            .join(",")
    );

    let narratives = Arc::new(FakeNarrativeStore::default());
    let llm = Arc::new(FakeLlm::new(vec![discovery, classification.as_str()]));
    let extractor = NarrativeExtractor::new(llm, narratives.clone(), NarrativeConfig::default());

    let frames = extractor
        .extract(NarrativeEntityType::Event, "ef-1", &titles)
        .await
        .unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].title_count, 5);

    let stored = narratives.load_frames(NarrativeEntityType::Event, "ef-1").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].key(), frames[0].key());
}
