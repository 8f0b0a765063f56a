//! One research turn, start to finish.
//!
//! Fresh questions run search → scrape → summarize → synthesize, strictly
//! in sequence. Questions the [`FollowUpDetector`] flags go straight to the
//! model together with the previous report.

use crate::followup::{FollowUpDetector, LeadWordDetector};
use crate::outcome::{Progress, TurnOutcome};
use crate::query::{KeywordClassifier, KeywordExtractor, QueryClassifier, QueryParser, StopWordExtractor};
use crate::session::SessionContext;
use quarry_common::Result;
use quarry_llm::analyzer::{ContentAnalyzer, DEFAULT_CONTENT_PREFIX};
use quarry_llm::outcome::ModelFailure;
use quarry_llm::synthesizer::SummarySynthesizer;
use quarry_llm::traits::LlmClient;
use quarry_llm::LlmClientSpec;
use quarry_web::{PageFetcher, SearchProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_MAX_SOURCES: usize = 3;

/// Builds a client for whichever model the user picked for this turn.
pub trait ModelConnector: Send + Sync {
    fn connect(&self, model: &str) -> Result<Arc<dyn LlmClient>>;
}

impl ModelConnector for LlmClientSpec {
    fn connect(&self, model: &str) -> Result<Arc<dyn LlmClient>> {
        quarry_llm::connect(self, model)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// How many search results are scraped per turn.
    pub max_sources: usize,
    pub content_prefix_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_sources: DEFAULT_MAX_SOURCES,
            content_prefix_chars: DEFAULT_CONTENT_PREFIX,
        }
    }
}

pub fn followup_prompt(last_query: &str, last_summary: &str, query: &str) -> String {
    format!(
        "Previous Query: {last_query}\nPrevious Summary:\n{last_summary}\n\n\
         Follow-Up Question: {query}\n\
         Please respond using the original context + this follow-up."
    )
}

pub struct Orchestrator<C = KeywordClassifier, K = StopWordExtractor, D = LeadWordDetector> {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    models: Arc<dyn ModelConnector>,
    parser: QueryParser<C, K>,
    followups: D,
    settings: PipelineSettings,
    progress: Option<UnboundedSender<Progress>>,
}

impl Orchestrator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        models: Arc<dyn ModelConnector>,
    ) -> Self {
        Self {
            search,
            fetcher,
            models,
            parser: QueryParser::default(),
            followups: LeadWordDetector::default(),
            settings: PipelineSettings::default(),
            progress: None,
        }
    }
}

impl<C, K, D> Orchestrator<C, K, D>
where
    C: QueryClassifier,
    K: KeywordExtractor,
    D: FollowUpDetector,
{
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_progress(mut self, tx: UnboundedSender<Progress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_parser<C2, K2>(self, parser: QueryParser<C2, K2>) -> Orchestrator<C2, K2, D>
    where
        C2: QueryClassifier,
        K2: KeywordExtractor,
    {
        Orchestrator {
            search: self.search,
            fetcher: self.fetcher,
            models: self.models,
            parser,
            followups: self.followups,
            settings: self.settings,
            progress: self.progress,
        }
    }

    pub fn with_followup_detector<D2: FollowUpDetector>(self, followups: D2) -> Orchestrator<C, K, D2> {
        Orchestrator {
            search: self.search,
            fetcher: self.fetcher,
            models: self.models,
            parser: self.parser,
            followups,
            settings: self.settings,
            progress: self.progress,
        }
    }

    pub fn is_followup(&self, session: &SessionContext, query: &str) -> bool {
        self.followups.is_followup(query, session.last_query())
    }

    fn emit(&self, event: Progress) {
        tracing::debug!(progress = %event, "research.progress");
        if let Some(tx) = &self.progress {
            // Nobody listening is fine.
            let _ = tx.send(event);
        }
    }

    /// Run one turn against `session` using `model`.
    pub async fn submit(&self, session: &mut SessionContext, query: &str, model: &str) -> TurnOutcome {
        if query.trim().is_empty() {
            return TurnOutcome::EmptyQuery;
        }

        let client = match self.models.connect(model) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(model, error = %e, "research.model.unavailable");
                return TurnOutcome::ModelUnavailable {
                    model: model.to_string(),
                    failure: ModelFailure::from(e),
                };
            }
        };

        let started = Instant::now();
        let outcome = if self.is_followup(session, query) {
            self.follow_up(session, query, model, client).await
        } else {
            self.research(session, query, model, client).await
        };
        tracing::info!(
            model,
            success = outcome.is_success(),
            banner = %outcome.banner(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "research.turn.finished"
        );
        outcome
    }

    async fn follow_up(
        &self,
        session: &mut SessionContext,
        query: &str,
        model: &str,
        client: Arc<dyn LlmClient>,
    ) -> TurnOutcome {
        self.emit(Progress::FollowingUp);
        let prompt = followup_prompt(session.last_query(), session.last_summary(), query);
        let reply = ContentAnalyzer::new(client).generate(&prompt).await;

        session.record_followup(query, reply.text(), model);
        TurnOutcome::FollowUp {
            degraded: reply.failure().cloned(),
            response: reply.into_text(),
        }
    }

    async fn research(
        &self,
        session: &mut SessionContext,
        query: &str,
        model: &str,
        client: Arc<dyn LlmClient>,
    ) -> TurnOutcome {
        let parsed = self.parser.parse(query);
        let terms = parsed.search_terms();
        tracing::info!(
            query_type = %parsed.query_type,
            terms = %terms,
            "research.query.parsed"
        );

        self.emit(Progress::Searching { terms: terms.clone() });
        let results = self.search.search(&terms).await;
        if results.is_empty() {
            return TurnOutcome::NoSearchResults;
        }
        self.emit(Progress::Found { count: results.len() });

        let analyzer =
            ContentAnalyzer::new(client.clone()).with_content_prefix(self.settings.content_prefix_chars);
        let mut summaries = Vec::new();
        let mut sources = Vec::new();
        let mut degraded = 0;

        for result in results.iter().take(self.settings.max_sources) {
            self.emit(Progress::Scraping {
                title: result.title.clone(),
                link: result.link.clone(),
            });
            let Some(content) = self.fetcher.scrape(&result.link).await else {
                self.emit(Progress::Skipped { title: result.title.clone() });
                continue;
            };

            self.emit(Progress::Summarizing { title: result.title.clone() });
            let reply = analyzer.summarize(&content, query).await;
            if reply.is_degraded() {
                degraded += 1;
            }
            summaries.push(reply.into_text());
            sources.push(result.clone());
        }

        if summaries.is_empty() {
            return TurnOutcome::NoUsableSummaries;
        }
        if degraded > 0 {
            tracing::warn!(degraded, total = summaries.len(), "research.summaries.degraded");
        }

        self.emit(Progress::Synthesizing { summaries: summaries.len() });
        match SummarySynthesizer::new(client).combine_summaries(&summaries, query).await {
            Ok(report) => {
                session.record_report(query, &report, model);
                TurnOutcome::Report {
                    report,
                    sources,
                    degraded,
                }
            }
            Err(failure) => TurnOutcome::SynthesisFailed {
                model: model.to_string(),
                failure,
            },
        }
    }
}
