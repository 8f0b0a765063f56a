//! What a turn produced, and what happened along the way.

use quarry_llm::outcome::ModelFailure;
use quarry_web::SearchResult;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// A fresh research report. `degraded` counts sources whose summary
    /// fell back to placeholder text.
    Report {
        report: String,
        sources: Vec<SearchResult>,
        degraded: usize,
    },
    FollowUp {
        response: String,
        /// Set when the answer is the fallback text.
        degraded: Option<ModelFailure>,
    },
    NoSearchResults,
    NoUsableSummaries,
    SynthesisFailed {
        model: String,
        failure: ModelFailure,
    },
    /// No client could be built for the selected model.
    ModelUnavailable {
        model: String,
        failure: ModelFailure,
    },
    EmptyQuery,
}

impl TurnOutcome {
    /// Headline shown above the turn's result.
    pub fn banner(&self) -> String {
        match self {
            TurnOutcome::Report { .. } => "Final Research Summary".to_string(),
            TurnOutcome::FollowUp { .. } => "Follow-Up Response".to_string(),
            TurnOutcome::NoSearchResults => {
                "No search results found. Try a different query.".to_string()
            }
            TurnOutcome::NoUsableSummaries => "No usable summaries could be created.".to_string(),
            TurnOutcome::SynthesisFailed { model, failure }
            | TurnOutcome::ModelUnavailable { model, failure } => {
                if failure.is_quota() {
                    format!("Quota exceeded for `{model}`. Try switching model or wait.")
                } else {
                    format!("Something went wrong: {}", failure.message)
                }
            }
            TurnOutcome::EmptyQuery => "Please enter a research question.".to_string(),
        }
    }

    /// Report or follow-up text, if the turn produced any.
    pub fn text(&self) -> Option<&str> {
        match self {
            TurnOutcome::Report { report, .. } => Some(report),
            TurnOutcome::FollowUp { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.text().is_some()
    }
}

/// Pipeline milestones, sent as they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Searching { terms: String },
    Found { count: usize },
    Scraping { title: String, link: String },
    Skipped { title: String },
    Summarizing { title: String },
    Synthesizing { summaries: usize },
    FollowingUp,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Searching { terms } => write!(f, "Searching: {terms}"),
            Progress::Found { count } => write!(f, "Found {count} results"),
            Progress::Scraping { title, .. } => write!(f, "Scraping: {title}"),
            Progress::Skipped { title } => write!(f, "Nothing readable in: {title}"),
            Progress::Summarizing { title } => write!(f, "Summarizing: {title}"),
            Progress::Synthesizing { summaries } => {
                write!(f, "Synthesizing {summaries} summaries")
            }
            Progress::FollowingUp => f.write_str("Answering follow-up"),
        }
    }
}
