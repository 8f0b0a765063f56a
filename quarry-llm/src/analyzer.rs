//! Per-source summarisation and free-form follow-up generation.

use crate::outcome::{ModelFailure, ModelReply};
use crate::traits::LlmClient;
use std::sync::Arc;

pub const SUMMARY_FALLBACK: &str = "Summary unavailable due to an error.";
pub const FOLLOWUP_FALLBACK: &str = "Follow-up unavailable due to an error.";
pub const IRRELEVANT_SOURCE: &str = "No useful information found in this source.";
/// Characters of scraped content handed to the model per source.
pub const DEFAULT_CONTENT_PREFIX: usize = 3000;

pub struct ContentAnalyzer {
    client: Arc<dyn LlmClient>,
    content_prefix: usize,
}

impl ContentAnalyzer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            content_prefix: DEFAULT_CONTENT_PREFIX,
        }
    }

    pub fn with_content_prefix(mut self, chars: usize) -> Self {
        self.content_prefix = chars;
        self
    }

    /// Summarise `content` strictly in terms of what it says about `query`.
    ///
    /// Failures degrade to [`SUMMARY_FALLBACK`].
    pub async fn summarize(&self, content: &str, query: &str) -> ModelReply {
        let prompt = grounding_prompt(content, query, self.content_prefix);
        self.call(&prompt, SUMMARY_FALLBACK, "summarize").await
    }

    /// Send an arbitrary prompt. Failures degrade to [`FOLLOWUP_FALLBACK`].
    pub async fn generate(&self, prompt: &str) -> ModelReply {
        self.call(prompt, FOLLOWUP_FALLBACK, "generate").await
    }

    async fn call(&self, prompt: &str, fallback: &'static str, op: &'static str) -> ModelReply {
        match self.client.generate(prompt, None, None, None).await {
            Ok(resp) => ModelReply::Generated(resp.text.trim().to_string()),
            Err(e) => {
                tracing::error!(
                    model = self.client.model_name(),
                    op,
                    error = %e,
                    "analyzer.model_call.failed"
                );
                ModelReply::Degraded {
                    fallback,
                    failure: ModelFailure::from(e),
                }
            }
        }
    }
}

/// Build the prompt that keeps the model on the supplied content.
pub fn grounding_prompt(content: &str, query: &str, prefix_chars: usize) -> String {
    format!(
        "You are a research assistant. A user asked:\n'{query}'\n\n\
         Here is an article/content:\n\n{}\n\n\
         Give a short, factual summary based only on the content above. \
         If the content is irrelevant, say: '{IRRELEVANT_SOURCE}'",
        char_prefix(content, prefix_chars)
    )
}

fn char_prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
