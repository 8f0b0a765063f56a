use super::types::{SearchRequest, SearchResponse, SearchResult};
use crate::SearchProvider;
use async_trait::async_trait;
use quarry_common::{QuarryError, Result};
use quarry_http::{Auth, HttpClient, RequestOpts};
use std::time::{Duration, Instant};

pub const SERPER_BASE_URL: &str = "https://google.serper.dev/";
pub const DEFAULT_RESULT_COUNT: u32 = 5;

/// Minimal client for the Serper search API (web vertical, one page).
#[derive(Clone)]
pub struct SerperClient {
    http: HttpClient,
    api_key: Option<String>,
    num: u32,
}

impl SerperClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(SERPER_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(base_url)
            .map_err(|e| QuarryError::Config(format!("Serper endpoint: {e}")))?
            .with_timeout(timeout);
        Ok(Self {
            http,
            api_key,
            num: DEFAULT_RESULT_COUNT,
        })
    }

    pub fn with_result_count(mut self, num: u32) -> Self {
        self.num = num;
        self
    }

    /// Like [`SearchProvider::search`] but surfaces the failure.
    pub async fn try_search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| QuarryError::Config("SERPER_API_KEY is not set".to_string()))?;
        let auth = Auth::api_key_header("x-api-key", api_key)?;

        let resp: SearchResponse = self
            .http
            .post_json_opts(
                "search",
                &SearchRequest { q: query, num: self.num },
                RequestOpts {
                    auth: Some(auth),
                    ..Default::default()
                },
            )
            .await?;
        Ok(resp.organic)
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        let query_snippet = snippet(query, 160);
        let started = Instant::now();
        tracing::info!(target: "web.serper", query = %query_snippet, "serper.search.start");

        match self.try_search(query).await {
            Ok(results) => {
                tracing::info!(
                    target: "web.serper",
                    query = %query_snippet,
                    hit_count = results.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "serper.search.success"
                );
                results
            }
            Err(e) => {
                tracing::warn!(
                    target: "web.serper",
                    query = %query_snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "serper.search.error"
                );
                Vec::new()
            }
        }
    }
}

fn snippet(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
