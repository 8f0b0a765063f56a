//! Paragraph extraction from arbitrary web pages.

use crate::PageFetcher;
use ::scraper::{Html, Selector};
use async_trait::async_trait;
use quarry_http::{HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

/// Desktop browser user agent; several sites refuse unknown clients.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(5);
/// Paragraphs at or below this many characters are navigation, captions
/// and similar noise.
pub const MIN_PARAGRAPH_CHARS: usize = 50;

#[derive(Clone)]
pub struct WebScraper {
    http: HttpClient,
    timeout: Duration,
}

impl WebScraper {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        Ok(Self {
            http: HttpClient::unanchored()?,
            timeout,
        })
    }

    /// Fetch `url` and extract its paragraphs. `Ok(None)` means the page
    /// loaded but had nothing worth reading.
    pub async fn try_scrape(&self, url: &str) -> Result<Option<String>, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));

        let html = self
            .http
            .get_text(
                url,
                RequestOpts {
                    timeout: Some(self.timeout),
                    headers: Some(headers),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await?;
        Ok(extract_paragraphs(&html))
    }
}

#[async_trait]
impl PageFetcher for WebScraper {
    async fn scrape(&self, url: &str) -> Option<String> {
        match self.try_scrape(url).await {
            Ok(Some(text)) => {
                tracing::debug!(target: "web.scrape", %url, chars = text.chars().count(), "scrape.success");
                Some(text)
            }
            Ok(None) => {
                tracing::info!(target: "web.scrape", %url, "scrape.no_paragraphs");
                None
            }
            Err(e) => {
                tracing::warn!(target: "web.scrape", %url, error = %e, "scrape.error");
                None
            }
        }
    }
}

/// Join the text of every `<p>` longer than [`MIN_PARAGRAPH_CHARS`], in
/// document order, one per line.
///
/// ```
/// use quarry_web::scraper::extract_paragraphs;
///
/// let html = format!("<p>short</p><p>{}</p>", "long ".repeat(20));
/// let text = extract_paragraphs(&html).unwrap();
/// assert!(text.starts_with("long long"));
/// assert_eq!(extract_paragraphs("<p>too short</p>"), None);
/// ```
pub fn extract_paragraphs(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("p").ok()?;

    let text = doc
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .filter(|t| t.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join("\n");

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_long_paragraphs_in_order() {
        let first = "a".repeat(51);
        let second = "b".repeat(80);
        let html = format!(
            "<html><body><p>nav</p><p>{first}</p><div>{}</div><p>  {second}  </p></body></html>",
            "c".repeat(200)
        );
        let text = extract_paragraphs(&html).unwrap();
        assert_eq!(text, format!("{first}\n  {second}"));
    }

    #[test]
    fn exactly_fifty_chars_is_dropped() {
        let html = format!("<p>{}</p>", "x".repeat(50));
        assert_eq!(extract_paragraphs(&html), None);
    }

    #[test]
    fn nested_inline_markup_counts_toward_length() {
        let html = format!("<p>{} <a href='/x'>{}</a></p>", "a".repeat(30), "b".repeat(30));
        let text = extract_paragraphs(&html).unwrap();
        assert_eq!(text.chars().count(), 61);
    }

    #[test]
    fn no_paragraphs_is_none() {
        assert_eq!(extract_paragraphs("<html><body><div>hello</div></body></html>"), None);
        assert_eq!(extract_paragraphs(""), None);
    }
}
