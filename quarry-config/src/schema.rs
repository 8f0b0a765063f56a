//! Strongly typed view of `quarry.yaml`.
//!
//! Every section is always present after loading because the built-in
//! defaults are merged first. Secrets are kept raw; use the accessor
//! methods, which treat unexpanded `${VAR}` placeholders as missing.

use quarry_common::Provider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarryConfig {
    pub search: SearchSettings,
    pub llm: LlmSettings,
    pub scraper: ScraperSettings,
    pub research: ResearchSettings,
    pub logging: LoggingSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub num_results: u32,
    pub timeout_secs: u64,
}

impl SearchSettings {
    pub fn api_key(&self) -> Option<String> {
        resolved_secret(self.api_key.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: Provider,
    /// When absent, the provider's conventional variable is consulted
    /// (`GEMINI_API_KEY` or `OPENAI_API_KEY`).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Models offered for selection, in display order.
    pub models: Vec<String>,
    /// Falls back to the first entry of `models`.
    #[serde(default)]
    pub default_model: Option<String>,
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn api_key(&self) -> Option<String> {
        match self.api_key.as_deref() {
            Some(raw) => resolved_secret(Some(raw)),
            None => resolved_secret(std::env::var(provider_key_var(self.provider)).ok().as_deref()),
        }
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(String::as_str))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn provider_key_var(provider: Provider) -> &'static str {
    match provider {
        Provider::Gemini => "GEMINI_API_KEY",
        Provider::OpenAi => "OPENAI_API_KEY",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    pub timeout_secs: u64,
}

impl ScraperSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSettings {
    /// Search results considered per turn.
    pub max_sources: usize,
    /// Characters of each scraped page shown to the model.
    pub content_prefix_chars: usize,
    /// Longest question (in words) still treated as a follow-up.
    pub followup_max_words: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// `text` or `json`.
    pub format: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub dir: PathBuf,
}

/// Treat blank values and leftover `${VAR}` placeholders as unset.
pub fn resolved_secret(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value.contains("${") {
        None
    } else {
        Some(value.to_string())
    }
}
