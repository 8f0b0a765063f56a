//! Per-session research state.
//!
//! One [`SessionContext`] lives for as long as the user keeps the terminal
//! open (or for a single headless run). It is the only mutable state the
//! pipeline touches and is passed in explicitly on every turn.

use chrono::{DateTime, Utc};
use quarry_common::{QuarryError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const EXPORT_FILE_NAME: &str = "research_summary.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub query: String,
    pub response: String,
    pub is_followup: bool,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// History is append-only; only [`SessionContext::reset`] clears it.
/// `last_query`/`last_summary` track the latest successful fresh report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    last_query: String,
    last_summary: String,
    chat_history: Vec<ChatEntry>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_query.clear();
        self.last_summary.clear();
        self.chat_history.clear();
    }

    pub fn last_query(&self) -> &str {
        &self.last_query
    }

    pub fn last_summary(&self) -> &str {
        &self.last_summary
    }

    pub fn history(&self) -> &[ChatEntry] {
        &self.chat_history
    }

    pub fn is_empty(&self) -> bool {
        self.chat_history.is_empty()
    }

    pub fn record_report(&mut self, query: &str, report: &str, model: &str) {
        self.last_query = query.to_string();
        self.last_summary = report.to_string();
        self.push(query, report, false, model);
    }

    pub fn record_followup(&mut self, query: &str, response: &str, model: &str) {
        self.push(query, response, true, model);
    }

    fn push(&mut self, query: &str, response: &str, is_followup: bool, model: &str) {
        self.chat_history.push(ChatEntry {
            query: query.to_string(),
            response: response.to_string(),
            is_followup,
            model: model.to_string(),
            created_at: Utc::now(),
        });
    }

    /// The newest entry, but only if it is a report. A follow-up answered
    /// after the report hides it.
    pub fn latest_report(&self) -> Option<&ChatEntry> {
        self.chat_history.last().filter(|e| !e.is_followup)
    }

    /// Write the latest report to `dir/research_summary.txt`, creating
    /// `dir` if needed.
    pub fn export_latest(&self, dir: &Path) -> Result<PathBuf> {
        let entry = self
            .latest_report()
            .ok_or_else(|| QuarryError::Export("no report to export".to_string()))?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(EXPORT_FILE_NAME);
        std::fs::write(&path, &entry.response)?;
        tracing::info!(path = %path.display(), bytes = entry.response.len(), "session.export");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_updates_last_and_history() {
        let mut s = SessionContext::new();
        s.record_report("q1", "r1", "m");
        assert_eq!(s.last_query(), "q1");
        assert_eq!(s.last_summary(), "r1");
        assert_eq!(s.history().len(), 1);
        assert!(!s.history()[0].is_followup);
    }

    #[test]
    fn followups_leave_last_untouched() {
        let mut s = SessionContext::new();
        s.record_report("q1", "r1", "m");
        s.record_followup("why?", "because", "m");
        assert_eq!(s.last_query(), "q1");
        assert_eq!(s.last_summary(), "r1");
        assert_eq!(s.history().len(), 2);
        assert!(s.latest_report().is_none());
    }

    #[test]
    fn reset_empties_everything() {
        let mut s = SessionContext::new();
        s.record_report("q1", "r1", "m");
        s.record_followup("why?", "because", "m");
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.last_query(), "");
        assert_eq!(s.last_summary(), "");
    }

    #[test]
    fn export_writes_latest_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = SessionContext::new();
        s.record_report("q1", "first", "m");
        s.record_report("q2", "second", "m");
        let out = dir.path().join("nested");
        let path = s.export_latest(&out).unwrap();
        assert_eq!(path, out.join(EXPORT_FILE_NAME));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn export_without_report_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = SessionContext::new();
        assert!(matches!(s.export_latest(dir.path()), Err(QuarryError::Export(_))));
        s.record_report("q1", "r1", "m");
        s.record_followup("how?", "like so", "m");
        assert!(matches!(s.export_latest(dir.path()), Err(QuarryError::Export(_))));
    }
}
