//! The research pipeline: query heuristics, follow-up detection, session
//! state and the orchestrator that strings search, scraping and the model
//! wrappers together.
//!
//! ```no_run
//! use quarry_common::Provider;
//! use quarry_llm::LlmClientSpec;
//! use quarry_research::{Orchestrator, SessionContext};
//! use quarry_web::{scraper::WebScraper, serper::SerperClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> quarry_common::Result<()> {
//! let search = SerperClient::new(std::env::var("SERPER_API_KEY").ok(), Duration::from_secs(15))?;
//! let scraper = WebScraper::new(Duration::from_secs(5))?;
//! let models = LlmClientSpec::new(Provider::Gemini, std::env::var("GEMINI_API_KEY").ok());
//! let orchestrator = Orchestrator::new(Arc::new(search), Arc::new(scraper), Arc::new(models));
//!
//! let mut session = SessionContext::new();
//! let outcome = orchestrator.submit(&mut session, "Impact of AI on healthcare", "gemini-1.5-pro").await;
//! println!("{}", outcome.banner());
//! # Ok(())
//! # }
//! ```

pub mod followup;
pub mod orchestrator;
pub mod outcome;
pub mod query;
pub mod session;

pub use followup::{FollowUpDetector, LeadWordDetector};
pub use orchestrator::{ModelConnector, Orchestrator, PipelineSettings};
pub use outcome::{Progress, TurnOutcome};
pub use query::{ParsedQuery, QueryParser, QueryType};
pub use session::{ChatEntry, SessionContext};
pub use quarry_web::SearchResult;
