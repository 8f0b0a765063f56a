mod common;

use async_trait::async_trait;
use quarry_common::{QuarryError, Result};
use quarry_llm::analyzer::{FOLLOWUP_FALLBACK, SUMMARY_FALLBACK};
use quarry_llm::outcome::FailureKind;
use quarry_llm::traits::{LlmClient, LlmResponse};
use quarry_research::{ModelConnector, Orchestrator, PipelineSettings, SessionContext, TurnOutcome};
use quarry_web::{PageFetcher, SearchProvider, SearchResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const MODEL: &str = "gemini-1.5-pro";

#[derive(Default)]
struct FakeSearch {
    results: Vec<SearchResult>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    fn with_links(links: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            results: links
                .iter()
                .map(|l| SearchResult {
                    title: format!("Title {l}"),
                    link: l.to_string(),
                    snippet: String::new(),
                })
                .collect(),
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.queries.lock().unwrap().push(query.to_string());
        self.results.clone()
    }
}

#[derive(Default)]
struct FakePages {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FakePages {
    fn serving(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            fetched: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PageFetcher for FakePages {
    async fn scrape(&self, url: &str) -> Option<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned()
    }
}

/// Answers summarize and synthesis prompts differently and records both.
#[derive(Default)]
struct FakeModel {
    fail_summaries: bool,
    synthesis_error: Option<String>,
    followup_error: Option<String>,
    summarize_calls: Mutex<Vec<String>>,
    synthesis_calls: Mutex<Vec<String>>,
    followup_calls: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmClient for FakeModel {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let text = if prompt.starts_with("You are a research assistant.") {
            self.summarize_calls.lock().unwrap().push(prompt.to_string());
            if self.fail_summaries {
                return Err(QuarryError::Llm("upstream exploded".into()));
            }
            let n = self.summarize_calls.lock().unwrap().len();
            format!("summary {n}")
        } else if prompt.starts_with("Previous Query:") {
            self.followup_calls.lock().unwrap().push(prompt.to_string());
            if let Some(e) = &self.followup_error {
                return Err(QuarryError::Llm(e.clone()));
            }
            "follow-up answer".to_string()
        } else {
            self.synthesis_calls.lock().unwrap().push(prompt.to_string());
            if let Some(e) = &self.synthesis_error {
                return Err(QuarryError::Llm(e.clone()));
            }
            "final report".to_string()
        };
        Ok(LlmResponse {
            text,
            model: Some(MODEL.into()),
            tokens_used: None,
        })
    }

    fn model_name(&self) -> &str {
        MODEL
    }
}

struct SameModel(Arc<FakeModel>);

impl ModelConnector for SameModel {
    fn connect(&self, _model: &str) -> Result<Arc<dyn LlmClient>> {
        Ok(self.0.clone())
    }
}

struct NoModel;

impl ModelConnector for NoModel {
    fn connect(&self, model: &str) -> Result<Arc<dyn LlmClient>> {
        Err(QuarryError::Config(format!("unknown model {model}")))
    }
}

fn orchestrator(
    search: Arc<FakeSearch>,
    pages: Arc<FakePages>,
    model: Arc<FakeModel>,
) -> Orchestrator {
    Orchestrator::new(search, pages, Arc::new(SameModel(model)))
}

const LONG: &str = "A long enough paragraph about artificial intelligence in hospitals.";

#[tokio::test]
async fn two_of_three_scrapes_yield_two_summaries() {
    common::init_test_tracing();
    let search = FakeSearch::with_links(&["https://a", "https://b", "https://c", "https://d"]);
    let pages = FakePages::serving(&[("https://a", LONG), ("https://c", LONG), ("https://d", LONG)]);
    let model = Arc::new(FakeModel::default());
    let orch = orchestrator(search.clone(), pages.clone(), model.clone());

    let mut session = SessionContext::new();
    let outcome = orch
        .submit(&mut session, "Impact of AI on healthcare in 2025", MODEL)
        .await;

    assert_eq!(
        *search.queries.lock().unwrap(),
        vec!["impact ai healthcare 2025".to_string()]
    );
    // Only the first three results are considered.
    assert_eq!(
        *pages.fetched.lock().unwrap(),
        vec!["https://a", "https://b", "https://c"]
    );
    assert_eq!(model.summarize_calls.lock().unwrap().len(), 2);

    let synthesis = model.synthesis_calls.lock().unwrap();
    assert_eq!(synthesis.len(), 1);
    assert!(synthesis[0].contains("Source 1:\nsummary 1"));
    assert!(synthesis[0].contains("Source 2:\nsummary 2"));
    assert!(!synthesis[0].contains("Source 3:"));

    match outcome {
        TurnOutcome::Report {
            report,
            sources,
            degraded,
        } => {
            assert_eq!(report, "final report");
            assert_eq!(sources.len(), 2);
            assert_eq!(sources[1].link, "https://c");
            assert_eq!(degraded, 0);
        }
        other => panic!("expected report, got {other:?}"),
    }
    assert_eq!(session.last_query(), "Impact of AI on healthcare in 2025");
    assert_eq!(session.last_summary(), "final report");
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].model, MODEL);
}

#[tokio::test]
async fn no_search_results_stops_early() {
    let model = Arc::new(FakeModel::default());
    let pages = FakePages::serving(&[]);
    let orch = orchestrator(FakeSearch::with_links(&[]), pages.clone(), model.clone());

    let mut session = SessionContext::new();
    let outcome = orch.submit(&mut session, "obscure topic", MODEL).await;

    assert_eq!(outcome, TurnOutcome::NoSearchResults);
    assert!(pages.fetched.lock().unwrap().is_empty());
    assert!(session.is_empty());
}

#[tokio::test]
async fn unreadable_pages_mean_no_usable_summaries() {
    let model = Arc::new(FakeModel::default());
    let orch = orchestrator(
        FakeSearch::with_links(&["https://a", "https://b"]),
        FakePages::serving(&[]),
        model.clone(),
    );

    let mut session = SessionContext::new();
    let outcome = orch.submit(&mut session, "anything", MODEL).await;

    assert_eq!(outcome, TurnOutcome::NoUsableSummaries);
    assert!(model.synthesis_calls.lock().unwrap().is_empty());
    assert!(session.is_empty());
}

#[tokio::test]
async fn failed_summaries_are_fallback_text_and_counted() {
    let model = Arc::new(FakeModel {
        fail_summaries: true,
        ..Default::default()
    });
    let orch = orchestrator(
        FakeSearch::with_links(&["https://a", "https://b"]),
        FakePages::serving(&[("https://a", LONG), ("https://b", LONG)]),
        model.clone(),
    );

    let mut session = SessionContext::new();
    let outcome = orch.submit(&mut session, "anything", MODEL).await;

    let synthesis = model.synthesis_calls.lock().unwrap();
    assert!(synthesis[0].contains(&format!("Source 1:\n{SUMMARY_FALLBACK}")));
    assert!(matches!(outcome, TurnOutcome::Report { degraded: 2, .. }));
}

#[tokio::test]
async fn synthesis_quota_failure_is_classified_and_state_untouched() {
    let model = Arc::new(FakeModel {
        synthesis_error: Some("429 quota exceeded".into()),
        ..Default::default()
    });
    let orch = orchestrator(
        FakeSearch::with_links(&["https://a"]),
        FakePages::serving(&[("https://a", LONG)]),
        model,
    );

    let mut session = SessionContext::new();
    session.record_report("earlier", "earlier report", MODEL);
    let outcome = orch.submit(&mut session, "Tell me about deep sea creatures", MODEL).await;

    match &outcome {
        TurnOutcome::SynthesisFailed { failure, .. } => {
            assert_eq!(failure.kind, FailureKind::QuotaExceeded)
        }
        other => panic!("expected synthesis failure, got {other:?}"),
    }
    assert_eq!(
        outcome.banner(),
        "Quota exceeded for `gemini-1.5-pro`. Try switching model or wait."
    );
    assert_eq!(session.last_query(), "earlier");
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn synthesis_generic_failure_is_other() {
    let model = Arc::new(FakeModel {
        synthesis_error: Some("connection reset by peer".into()),
        ..Default::default()
    });
    let orch = orchestrator(
        FakeSearch::with_links(&["https://a"]),
        FakePages::serving(&[("https://a", LONG)]),
        model,
    );
    let outcome = orch.submit(&mut SessionContext::new(), "anything", MODEL).await;
    assert!(matches!(
        outcome,
        TurnOutcome::SynthesisFailed { ref failure, .. } if failure.kind == FailureKind::Other
    ));
}

#[tokio::test]
async fn follow_up_uses_previous_context_without_searching() {
    common::init_test_tracing();
    let search = FakeSearch::with_links(&["https://a"]);
    let model = Arc::new(FakeModel::default());
    let orch = orchestrator(search.clone(), FakePages::serving(&[]), model.clone());

    let mut session = SessionContext::new();
    session.record_report("AI in healthcare", "AI helps triage.", MODEL);
    let outcome = orch
        .submit(&mut session, "What about renewable energy instead?", MODEL)
        .await;

    assert_eq!(
        outcome,
        TurnOutcome::FollowUp {
            response: "follow-up answer".into(),
            degraded: None,
        }
    );
    assert!(search.queries.lock().unwrap().is_empty());
    let prompts = model.followup_calls.lock().unwrap();
    assert_eq!(
        prompts[0],
        "Previous Query: AI in healthcare\nPrevious Summary:\nAI helps triage.\n\n\
         Follow-Up Question: What about renewable energy instead?\n\
         Please respond using the original context + this follow-up."
    );
    assert_eq!(session.last_query(), "AI in healthcare");
    assert_eq!(session.last_summary(), "AI helps triage.");
    assert_eq!(session.history().len(), 2);
    assert!(session.history()[1].is_followup);
    assert!(session.latest_report().is_none());
}

#[tokio::test]
async fn failed_follow_up_is_recorded_as_fallback() {
    let model = Arc::new(FakeModel {
        followup_error: Some("rate limit reached".into()),
        ..Default::default()
    });
    let orch = orchestrator(FakeSearch::with_links(&[]), FakePages::serving(&[]), model);

    let mut session = SessionContext::new();
    session.record_report("q", "r", MODEL);
    let outcome = orch.submit(&mut session, "why?", MODEL).await;

    match outcome {
        TurnOutcome::FollowUp { response, degraded } => {
            assert_eq!(response, FOLLOWUP_FALLBACK);
            assert!(degraded.unwrap().is_quota());
        }
        other => panic!("expected follow-up, got {other:?}"),
    }
    assert_eq!(session.history()[1].response, FOLLOWUP_FALLBACK);
}

#[tokio::test]
async fn first_question_is_never_a_follow_up() {
    let search = FakeSearch::with_links(&[]);
    let orch = orchestrator(search.clone(), FakePages::serving(&[]), Arc::new(FakeModel::default()));
    let outcome = orch.submit(&mut SessionContext::new(), "What is rust?", MODEL).await;
    assert_eq!(outcome, TurnOutcome::NoSearchResults);
    assert_eq!(search.queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_queries_touch_nothing() {
    let search = FakeSearch::with_links(&["https://a"]);
    let orch = orchestrator(search.clone(), FakePages::serving(&[]), Arc::new(FakeModel::default()));
    let mut session = SessionContext::new();
    assert_eq!(orch.submit(&mut session, "   ", MODEL).await, TurnOutcome::EmptyQuery);
    assert!(search.queries.lock().unwrap().is_empty());
    assert!(session.is_empty());
}

#[tokio::test]
async fn unknown_model_is_reported() {
    let orch = Orchestrator::new(
        FakeSearch::with_links(&["https://a"]),
        FakePages::serving(&[]),
        Arc::new(NoModel),
    );
    let outcome = orch.submit(&mut SessionContext::new(), "anything", "nope").await;
    assert!(matches!(outcome, TurnOutcome::ModelUnavailable { ref model, .. } if model == "nope"));
}

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let orch = orchestrator(
        FakeSearch::with_links(&["https://a", "https://b"]),
        FakePages::serving(&[("https://a", LONG)]),
        Arc::new(FakeModel::default()),
    )
    .with_settings(PipelineSettings {
        max_sources: 2,
        content_prefix_chars: 100,
    })
    .with_progress(tx);

    orch.submit(&mut SessionContext::new(), "rust actors", MODEL).await;
    drop(orch);

    let mut events = Vec::new();
    while let Some(e) = rx.recv().await {
        events.push(e.to_string());
    }
    assert_eq!(
        events,
        vec![
            "Searching: rust actors",
            "Found 2 results",
            "Scraping: Title https://a",
            "Summarizing: Title https://a",
            "Scraping: Title https://b",
            "Nothing readable in: Title https://b",
            "Synthesizing 1 summaries",
        ]
    );
}
