use async_trait::async_trait;
use quarry_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// One request/response exchange with a hosted model. No streaming, no tools.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion. `system_prompt`, `max_tokens` and `temperature` are
    /// left to the provider's defaults when `None`.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    fn model_name(&self) -> &str;
}
