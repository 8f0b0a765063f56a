//! Query classification and keyword extraction.
//!
//! Both are plain keyword heuristics. They sit behind [`QueryClassifier`]
//! and [`KeywordExtractor`] so a real tokenizer or classifier can replace
//! them without touching the pipeline.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    #[serde(rename = "news")]
    News,
    #[serde(rename = "factual")]
    Factual,
    #[serde(rename = "how-to")]
    HowTo,
    #[serde(rename = "general")]
    General,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::News => "news",
            QueryType::Factual => "factual",
            QueryType::HowTo => "how-to",
            QueryType::General => "general",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    pub original_query: String,
    pub query_type: QueryType,
    pub keywords: Vec<String>,
}

impl ParsedQuery {
    /// What gets sent to the search provider.
    pub fn search_terms(&self) -> String {
        self.keywords.join(" ")
    }
}

pub trait QueryClassifier: Send + Sync {
    fn classify(&self, query: &str) -> QueryType;
}

pub trait KeywordExtractor: Send + Sync {
    fn extract(&self, query: &str) -> Vec<String>;
}

/// Checked in this order; the first set with any phrase contained in the
/// lower-cased query wins.
const TYPE_KEYWORDS: &[(QueryType, &[&str])] = &[
    (QueryType::News, &["latest", "breaking", "news", "trending"]),
    (
        QueryType::Factual,
        &["what is", "define", "explain", "who is", "history of"],
    ),
    (QueryType::HowTo, &["how to", "steps to", "guide", "tutorial"]),
];

const STOP_WORDS: &[&str] = &["the", "is", "a", "of", "and", "to", "in", "on", "for", "with", "at"];

/// Substring matching against fixed phrase lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl QueryClassifier for KeywordClassifier {
    fn classify(&self, query: &str) -> QueryType {
        let query = query.to_lowercase();
        TYPE_KEYWORDS
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| query.contains(p)))
            .map(|(kind, _)| *kind)
            .unwrap_or(QueryType::General)
    }
}

/// `\w+` tokens, lower-cased, minus a short stop-word list. Order and
/// duplicates are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopWordExtractor;

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("word regex must compile"))
}

impl KeywordExtractor for StopWordExtractor {
    fn extract(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        word_regex()
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !STOP_WORDS.contains(t))
            .map(str::to_string)
            .collect()
    }
}

/// Composes a classifier and an extractor. Infallible.
///
/// ```
/// use quarry_research::query::{QueryParser, QueryType};
///
/// let parser: QueryParser = QueryParser::default();
/// let parsed = parser.parse("How to brew the perfect espresso");
/// assert_eq!(parsed.query_type, QueryType::HowTo);
/// assert_eq!(parsed.search_terms(), "how brew perfect espresso");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryParser<C = KeywordClassifier, K = StopWordExtractor> {
    classifier: C,
    extractor: K,
}

impl<C: QueryClassifier, K: KeywordExtractor> QueryParser<C, K> {
    pub fn new(classifier: C, extractor: K) -> Self {
        Self {
            classifier,
            extractor,
        }
    }

    pub fn classify_query(&self, query: &str) -> QueryType {
        self.classifier.classify(query)
    }

    pub fn extract_keywords(&self, query: &str) -> Vec<String> {
        self.extractor.extract(query)
    }

    pub fn parse(&self, query: &str) -> ParsedQuery {
        ParsedQuery {
            original_query: query.to_string(),
            query_type: self.classify_query(query),
            keywords: self.extract_keywords(query),
        }
    }
}
