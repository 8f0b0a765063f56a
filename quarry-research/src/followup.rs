//! Decides whether a new question continues the previous turn.

use std::collections::HashSet;

/// Questions starting with one of these words read as a continuation.
pub const LEAD_WORDS: &[&str] = &[
    "what", "why", "how", "does", "do", "is", "are", "then", "can", "should", "will",
];
pub const DEFAULT_MAX_FOLLOWUP_WORDS: usize = 12;
/// Share of the previous query's distinct words the new one must reuse to
/// count as related.
pub const OVERLAP_THRESHOLD: f64 = 0.3;

pub trait FollowUpDetector: Send + Sync {
    fn is_followup(&self, new_query: &str, last_query: &str) -> bool;
}

/// Lead-word heuristic: a short question opening with a word from
/// [`LEAD_WORDS`] is a follow-up.
///
/// The token overlap with the previous query is computed and logged but
/// never turns the answer into `true`; only the lead-word rule does.
#[derive(Debug, Clone)]
pub struct LeadWordDetector {
    max_words: usize,
}

impl Default for LeadWordDetector {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_FOLLOWUP_WORDS,
        }
    }
}

impl LeadWordDetector {
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn starts_with_lead_word(q: &str) -> bool {
    LEAD_WORDS.iter().any(|w| {
        q.strip_prefix(w)
            .is_some_and(|rest| !rest.chars().next().is_some_and(is_word_char))
    })
}

/// Distinct whitespace tokens of `new` also present in `last`, relative to
/// the number of distinct tokens in `last`.
pub fn overlap_ratio(new: &str, last: &str) -> f64 {
    let new_tokens: HashSet<&str> = new.split_whitespace().collect();
    let last_tokens: HashSet<&str> = last.split_whitespace().collect();
    let shared = new_tokens.intersection(&last_tokens).count();
    shared as f64 / last_tokens.len().max(1) as f64
}

impl FollowUpDetector for LeadWordDetector {
    fn is_followup(&self, new_query: &str, last_query: &str) -> bool {
        if last_query.is_empty() || new_query.trim().is_empty() {
            return false;
        }

        let new_q = new_query.trim().to_lowercase();
        let last_q = last_query.trim().to_lowercase();

        if starts_with_lead_word(&new_q) && new_q.split_whitespace().count() <= self.max_words {
            return true;
        }

        // TODO: decide whether a high overlap should count as a follow-up;
        // today it is only reported.
        let ratio = overlap_ratio(&new_q, &last_q);
        tracing::debug!(
            ratio,
            threshold = OVERLAP_THRESHOLD,
            related = ratio >= OVERLAP_THRESHOLD,
            "followup.overlap"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(new: &str, last: &str) -> bool {
        LeadWordDetector::default().is_followup(new, last)
    }

    #[test]
    fn short_lead_word_questions_follow_up() {
        assert!(detect("What about renewable energy instead?", "AI in healthcare"));
        assert!(detect("why?", "anything"));
        assert!(detect("  Does it scale  ", "rust web servers"));
        assert!(detect("is-it cheaper", "solar panels"));
    }

    #[test]
    fn no_lead_word_is_fresh_regardless_of_overlap() {
        assert!(!detect(
            "Tell me about deep sea creatures",
            "Tell me about deep sea creatures"
        ));
        assert!(!detect("deep sea creatures habitats", "deep sea creatures"));
    }

    #[test]
    fn lead_word_needs_a_word_boundary() {
        assert!(!detect("whatever happened to vinyl", "music"));
        assert!(!detect("island travel tips", "holidays"));
        assert!(!detect("dogs vs cats", "pets"));
    }

    #[test]
    fn long_questions_are_fresh() {
        let thirteen = "how a b c d e f g h i j k l";
        assert_eq!(thirteen.split_whitespace().count(), 13);
        assert!(!detect(thirteen, "previous"));
        let twelve = "how a b c d e f g h i j k";
        assert!(detect(twelve, "previous"));
    }

    #[test]
    fn needs_a_previous_query_and_a_new_one() {
        assert!(!detect("what about it", ""));
        assert!(!detect("   ", "previous"));
    }

    #[test]
    fn word_limit_is_configurable() {
        let strict = LeadWordDetector::new(2);
        assert!(!strict.is_followup("what about this", "previous"));
        assert!(strict.is_followup("what now", "previous"));
    }

    #[test]
    fn overlap_uses_distinct_previous_tokens() {
        assert_eq!(overlap_ratio("a b", "a a b c"), 2.0 / 3.0);
        assert_eq!(overlap_ratio("x", ""), 0.0);
    }
}
