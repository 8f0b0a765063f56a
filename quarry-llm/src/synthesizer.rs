//! Consolidates per-source summaries into one report.

use crate::outcome::ModelFailure;
use crate::traits::LlmClient;
use std::sync::Arc;

pub struct SummarySynthesizer {
    client: Arc<dyn LlmClient>,
}

impl SummarySynthesizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// One model call over every summary. Unlike the analyzer this does not
    /// degrade: the failure goes back to the caller.
    pub async fn combine_summaries(
        &self,
        summaries: &[String],
        query: &str,
    ) -> Result<String, ModelFailure> {
        let prompt = synthesis_prompt(summaries, query);
        match self.client.generate(&prompt, None, None, None).await {
            Ok(resp) => Ok(resp.text.trim().to_string()),
            Err(e) => {
                tracing::error!(
                    model = self.client.model_name(),
                    sources = summaries.len(),
                    error = %e,
                    "synthesizer.model_call.failed"
                );
                Err(ModelFailure::from(e))
            }
        }
    }
}

pub fn synthesis_prompt(summaries: &[String], query: &str) -> String {
    let summaries_text = summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("Source {}:\n{}", i + 1, summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "A user asked:\n'{query}'\n\n\
         Here are multiple AI-generated summaries based on different sources:\n\n\
         {summaries_text}\n\n\
         Your job is to create a final research summary for the user. It should:\n\
         - Be well-structured\n\
         - Avoid repeating the same points\n\
         - Present different angles if any\n\
         - Be no more than 250 words\n"
    )
}
