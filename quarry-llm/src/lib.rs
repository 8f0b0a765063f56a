//! Provider-agnostic language-model integration for Quarry.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, concrete
//! clients for Gemini and OpenAI, and the two wrappers the research
//! pipeline talks to: [`analyzer::ContentAnalyzer`] (per-source summaries,
//! follow-up answers) and [`synthesizer::SummarySynthesizer`] (the final
//! report).
//!
//! # Examples
//! ```no_run
//! use quarry_common::{Provider, Result};
//! use quarry_llm::{connect, LlmClientSpec};
//!
//! # fn main() -> Result<()> {
//! let spec = LlmClientSpec::new(Provider::Gemini, std::env::var("GEMINI_API_KEY").ok());
//! let client = connect(&spec, "gemini-1.5-pro")?;
//! assert_eq!(client.model_name(), "gemini-1.5-pro");
//! # Ok(())
//! # }
//! ```
pub mod analyzer;
pub mod gemini;
pub mod openai;
pub mod outcome;
pub mod synthesizer;
pub mod traits;

use gemini::GeminiClient;
use openai::OpenAiClient;
use quarry_common::{Provider, Result};
use std::sync::Arc;
use std::time::Duration;
use traits::LlmClient;

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything needed to build a client except the model name, which the
/// user may switch between submissions.
#[derive(Debug, Clone)]
pub struct LlmClientSpec {
    pub provider: Provider,
    pub api_key: Option<String>,
    /// Overrides the provider's public endpoint.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl LlmClientSpec {
    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            endpoint: None,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }
}

/// Build a client for `model`. A missing API key is not an error here; the
/// client reports it on its first call.
pub fn connect(spec: &LlmClientSpec, model: &str) -> Result<Arc<dyn LlmClient>> {
    let model = model.to_string();
    let key = spec.api_key.clone();
    match (spec.provider, spec.endpoint.as_deref()) {
        (Provider::Gemini, None) => Ok(Arc::new(GeminiClient::new(key, model, spec.timeout)?)),
        (Provider::Gemini, Some(base)) => Ok(Arc::new(GeminiClient::with_base_url(
            base,
            key,
            model,
            spec.timeout,
        )?)),
        (Provider::OpenAi, None) => Ok(Arc::new(OpenAiClient::new(key, model, spec.timeout)?)),
        (Provider::OpenAi, Some(base)) => Ok(Arc::new(OpenAiClient::with_base_url(
            base,
            key,
            model,
            spec.timeout,
        )?)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::traits::{LlmClient, LlmResponse};
    use async_trait::async_trait;
    use quarry_common::{QuarryError, Result};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies in order, or fails every call.
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<String>>,
        failure: Option<String>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn replying<const N: usize>(replies: [&str; N]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                failure: None,
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::new()),
                failure: Some(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn prompts(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(
            &self,
            prompt: &str,
            _system_prompt: Option<&str>,
            _max_tokens: Option<u32>,
            _temperature: Option<f32>,
        ) -> Result<LlmResponse> {
            self.seen.lock().unwrap().push(prompt.to_string());
            if let Some(msg) = &self.failure {
                return Err(QuarryError::Llm(msg.clone()));
            }
            let text = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "ok".to_string());
            Ok(LlmResponse {
                text,
                model: Some("scripted".into()),
                tokens_used: None,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }
}
