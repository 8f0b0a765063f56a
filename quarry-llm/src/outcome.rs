//! Tagged results for model calls.
//!
//! Every wrapper around a model call reports what happened instead of
//! hiding it: the analyzer degrades to fallback text but says so, and the
//! synthesizer hands its failure back to the caller.

use quarry_common::QuarryError;

/// Error-message fragments that indicate a provider quota or rate limit.
const QUOTA_MARKERS: &[&str] = &["quota", "rate limit", "429", "exceeded", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    QuotaExceeded,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ModelFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ModelFailure {
    /// Classify a failure message by substring, case-insensitively.
    ///
    /// ```
    /// use quarry_llm::outcome::{FailureKind, ModelFailure};
    ///
    /// let f = ModelFailure::from_message("server returned error 429 Too Many Requests");
    /// assert_eq!(f.kind, FailureKind::QuotaExceeded);
    /// let f = ModelFailure::from_message("connection reset by peer");
    /// assert_eq!(f.kind, FailureKind::Other);
    /// ```
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
            FailureKind::QuotaExceeded
        } else {
            FailureKind::Other
        };
        Self { kind, message }
    }

    pub fn is_quota(&self) -> bool {
        self.kind == FailureKind::QuotaExceeded
    }
}

impl From<&QuarryError> for ModelFailure {
    fn from(err: &QuarryError) -> Self {
        Self::from_message(err.to_string())
    }
}

impl From<QuarryError> for ModelFailure {
    fn from(err: QuarryError) -> Self {
        Self::from(&err)
    }
}

/// Text produced by a model wrapper that never fails outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    Generated(String),
    /// The call failed; `fallback` is what the user gets to read instead.
    Degraded {
        fallback: &'static str,
        failure: ModelFailure,
    },
}

impl ModelReply {
    pub fn text(&self) -> &str {
        match self {
            ModelReply::Generated(text) => text,
            ModelReply::Degraded { fallback, .. } => fallback,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ModelReply::Generated(text) => text,
            ModelReply::Degraded { fallback, .. } => fallback.to_string(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ModelReply::Degraded { .. })
    }

    pub fn failure(&self) -> Option<&ModelFailure> {
        match self {
            ModelReply::Generated(_) => None,
            ModelReply::Degraded { failure, .. } => Some(failure),
        }
    }
}
