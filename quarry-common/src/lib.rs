//! Shared types and utilities for the Quarry crates.
//!
//! Everything here is small enough that every crate in the workspace can
//! depend on it without pulling heavy transitive costs.
//!
//! - [`QuarryError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`Provider`]: which language-model backend a session talks to
//!
//! ```rust
//! use quarry_common::{Provider, QuarryError};
//!
//! assert_eq!(Provider::default(), Provider::Gemini);
//! let err = QuarryError::Config("missing search key".into());
//! assert_eq!(err.to_string(), "Configuration error: missing search key");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Language-model backends Quarry knows how to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    OpenAi,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Gemini => f.write_str("gemini"),
            Provider::OpenAi => f.write_str("openai"),
        }
    }
}

/// Error types used across the Quarry workspace.
#[derive(thiserror::Error, Debug)]
pub enum QuarryError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote HTTP service failed or answered with an error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A language-model call failed.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Writing a report to disk failed.
    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`QuarryError`].
pub type Result<T> = std::result::Result<T, QuarryError>;
