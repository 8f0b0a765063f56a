//! Minimal HTTP client with safe logging and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, timeout
//! - JSON POST for API calls and a charset-aware text GET for fetching pages
//! - Redacts sensitive query params/headers and never logs secret values
//! - Optional *raw* request/response logging via `QUARRY_HTTP_RAW=1`
//!
//! Every request is attempted exactly once; callers decide how to degrade.
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), quarry_http::HttpError> {
//! let client = quarry_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .post_json("v1/items", None, &serde_json::json!({"q": "rust"}))
//!     .await?;
//! # Ok(()) }
//! ```

use quarry_common::QuarryError;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;

const RAW_ENV: &str = "QUARRY_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
/// Upper bound on bodies read by [`HttpClient::get_text`]. The body is
/// streamed and reading stops once this many bytes have arrived.
pub const MAX_TEXT_BYTES: usize = 5 * 1024 * 1024;
const MAX_JSON_BYTES: usize = 32 * 1024 * 1024;

const SECRET_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "x-api-key",
    "x-goog-api-key",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_KEYS.contains(&lower.as_str())
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        if let Ok(s) = std::str::from_utf8(bytes) {
            parts.push(format!("-d '{}'", clip(s, RAW_MAX_BODY).replace('\'', r"'\''")));
        } else {
            parts.push(format!("--data-binary @- # ({} bytes)", bytes.len()));
        }
    }
    let (host_path, query) = redact_query(url);
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        parts.push(format!("'{}://{}'", url.scheme(), host_path));
    } else {
        parts.push(format!("'{}://{}?{}'", url.scheme(), host_path, query));
    }
    parts.join(" ")
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_name(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_name(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl From<HttpError> for QuarryError {
    fn from(e: HttpError) -> Self {
        QuarryError::Http(e.to_string())
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use quarry_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header (e.g., Serper: X-API-KEY)
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    None,
}

impl Auth<'_> {
    /// Build a header auth from an API key, validating it first.
    ///
    /// ```
    /// use quarry_http::Auth;
    ///
    /// let auth = Auth::api_key_header("x-api-key", " abc123 ").unwrap();
    /// match auth {
    ///     Auth::Header { value, .. } => assert_eq!(value, "abc123"),
    ///     _ => unreachable!(),
    /// }
    /// ```
    pub fn api_key_header(name: &'static str, key: &str) -> Result<Self, HttpError> {
        let key = sanitize_api_key(key)?;
        let value =
            HeaderValue::from_str(&key).map_err(|e| HttpError::Build(format!("{name}: {e}")))?;
        Ok(Auth::Header {
            name: HeaderName::from_static(name),
            value,
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use quarry_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     auth: Some(Auth::Bearer("demo")),
///     query: Some(vec![("hl", Cow::Borrowed("en"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert!(opts.allow_absolute == false);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Option<Url>,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use quarry_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        Ok(Self {
            base: Some(base),
            ..Self::unanchored()?
        })
    }

    /// Construct a client with no base URL; every path must be absolute.
    pub fn unanchored() -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base: None,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use quarry_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// POST JSON using optional Bearer auth.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOpts {
            auth: bearer.map(Auth::Bearer),
            ..Default::default()
        };
        self.post_json_opts(path, body, opts).await
    }

    /// POST JSON with per-request options (headers/query/auth/timeout).
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let got = self
            .execute(Method::POST, path, Some(body), opts, MAX_JSON_BYTES)
            .await?;
        decode_json(&got.req_id, &got.body)
    }

    /// GET a document as text, decoded with the charset named in its
    /// `Content-Type` (UTF-8 when absent or unknown). At most
    /// [`MAX_TEXT_BYTES`] of the body are read.
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let got = self
            .execute::<()>(Method::GET, path, None, opts, MAX_TEXT_BYTES)
            .await?;
        let encoding = charset(&got.headers)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, used, _) = encoding.decode(&got.body);
        if used != UTF_8 {
            tracing::debug!(req_id = %got.req_id, charset = used.name(), "http.response.charset");
        }
        if got.truncated {
            // The cap may split a multi-byte sequence; drop the replacement it decodes to.
            return Ok(text.trim_end_matches('\u{FFFD}').to_string());
        }
        Ok(text.into_owned())
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        match &self.base {
            Some(base) => {
                if allow_absolute {
                    if let Ok(abs) = Url::parse(path) {
                        return Ok(abs);
                    }
                }
                base.join(path).map_err(|e| HttpError::Url(e.to_string()))
            }
            None => Url::parse(path).map_err(|e| HttpError::Url(e.to_string())),
        }
    }

    // One attempt per request. Returns the headers and at most `cap` bytes
    // of a successful response; non-2xx statuses become `HttpError::Api`.
    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOpts<'_>,
        cap: usize,
    ) -> Result<Fetched, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path, opts.allow_absolute)?;
        let mut rb = self.inner.request(method.clone(), url.clone());

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        rb = rb.timeout(timeout);

        let query: Vec<(&str, Cow<'_, str>)> = opts.query.clone().unwrap_or_default();
        if !query.is_empty() {
            let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb = rb.query(&pairs);
        }

        // Serialize up front so the exact bytes can be logged.
        let mut request_body_bytes: Option<Vec<u8>> = None;
        if let Some(b) = body {
            let bytes = serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?;
            request_body_bytes = Some(bytes.clone());
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        match &opts.auth {
            Some(Auth::Bearer(tok)) => {
                let tok = sanitize_api_key(tok)?;
                rb = rb.bearer_auth(tok);
            }
            Some(Auth::Header { name, value }) => {
                rb = rb.header(name, value);
            }
            Some(Auth::None) | None => {}
        }

        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let redacted_q: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| {
                let v = if is_secret_name(k) {
                    "<redacted>".to_string()
                } else {
                    v.as_ref().to_string()
                };
                ((*k).to_string(), v)
            })
            .collect();
        let req_id = format!("r-{}", uuid::Uuid::new_v4().simple());

        tracing::debug!(
            req_id = %req_id,
            method = %method,
            host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            query = ?redacted_q,
            timeout_ms = timeout.as_millis() as u64,
            auth_kind,
            has_body = %body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let merged = opts.headers.clone().unwrap_or_default();
            let curl = make_curl(&method, &url, &merged, request_body_bytes.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(
                req_id = %req_id,
                timeout = err.is_timeout(),
                message = %message,
                "http.network_error.send"
            );
            HttpError::Network(message)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let (bytes, truncated) = read_capped(resp, cap, &req_id).await?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let upstream_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-correlation-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        tracing::debug!(
            req_id = %req_id,
            %status,
            duration_ms = dur_ms,
            body_len = bytes.len(),
            truncated,
            x_request_id = %upstream_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let text = String::from_utf8_lossy(&bytes);
            let truncated = text.len() > RAW_MAX_BODY;
            tracing::info!(
                target: "http.raw",
                %req_id,
                status = %status,
                duration_ms = dur_ms,
                headers = ?hdrs,
                body = %clip(&text, RAW_MAX_BODY),
                truncated
            );
        }

        if status.is_success() {
            return Ok(Fetched {
                req_id,
                headers,
                body: bytes,
                truncated,
            });
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id = %req_id,
            %status,
            message = %message,
            x_request_id = %upstream_id,
            body_snippet = %snip_body(&bytes),
            "http.error"
        );
        Err(HttpError::Api {
            status,
            message,
            request_id: upstream_id,
        })
    }
}

// ==============================
// Helpers
// ==============================

struct Fetched {
    req_id: String,
    headers: HeaderMap,
    body: Vec<u8>,
    truncated: bool,
}

/// Stream the body chunk by chunk, stopping once `cap` bytes have arrived.
async fn read_capped(
    mut resp: Response,
    cap: usize,
    req_id: &str,
) -> Result<(Vec<u8>, bool), HttpError> {
    let mut buf = Vec::new();
    loop {
        let chunk = resp.chunk().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id = %req_id, message = %message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let Some(chunk) = chunk else {
            return Ok((buf, false));
        };
        let room = cap - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            tracing::warn!(req_id = %req_id, cap, "http.response.truncated");
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk);
    }
}

/// The `charset` parameter of the response's `Content-Type`, if any.
fn charset(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CONTENT_TYPE)?
        .to_str()
        .ok()?
        .split(';')
        .skip(1)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        })
}

fn decode_json<T: DeserializeOwned>(req_id: &str, bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice::<T>(bytes).map_err(|e| {
        let snippet = snip_body(bytes);
        tracing::warn!(
            req_id = %req_id,
            serde_line = %e.line(),
            serde_col = %e.column(),
            serde_err = %e.to_string(),
            body_snippet = %snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn extract_error_message(body: &[u8]) -> String {
    // Google/OpenAI style: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn clip(s: &str, max: usize) -> Cow<'_, str> {
    if s.len() <= max {
        return Cow::Borrowed(s);
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", &s[..end]))
}

fn snip_body(body: &[u8]) -> String {
    clip(&String::from_utf8_lossy(body), 500).into_owned()
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_api_key(" \"ab c\n\" ").unwrap(), "abc");
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("clé").is_err());
    }

    #[test]
    fn error_message_prefers_nested_envelope() {
        let body = br#"{"error":{"message":"Quota exceeded for metric"}}"#;
        assert_eq!(extract_error_message(body), "Quota exceeded for metric");
        let body = br#"{"detail":"bad key"}"#;
        assert_eq!(extract_error_message(body), "bad key");
        assert_eq!(extract_error_message(b"plain failure"), "plain failure");
    }

    #[test]
    fn query_secrets_are_redacted() {
        let url = Url::parse("https://example.com/v1/x?key=secret&q=rust").unwrap();
        let (host_path, q) = redact_query(&url);
        assert_eq!(host_path, "example.com/v1/x");
        assert_eq!(
            q,
            vec![
                ("key".to_string(), "<redacted>".to_string()),
                ("q".to_string(), "rust".to_string())
            ]
        );
    }

    #[test]
    fn api_key_headers_are_redacted() {
        let mut h = HeaderMap::new();
        h.insert("x-api-key", HeaderValue::from_static("top-secret"));
        h.insert("user-agent", HeaderValue::from_static("Mozilla/5.0"));
        let redacted = redact_headers(&h);
        assert!(redacted.contains(&("x-api-key".into(), "<redacted>".into())));
        assert!(redacted.contains(&("user-agent".into(), "Mozilla/5.0".into())));
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let s = "ééééé";
        let clipped = clip(s, 3);
        assert_eq!(clipped, "é...");
    }

    #[test]
    fn charset_is_read_from_content_type() {
        let mut h = HeaderMap::new();
        assert_eq!(charset(&h), None);
        h.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; Charset=\"ISO-8859-1\""),
        );
        assert_eq!(charset(&h), Some("ISO-8859-1"));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        assert_eq!(charset(&h), None);
    }

    #[test]
    fn unanchored_client_requires_absolute_urls() {
        let client = HttpClient::unanchored().unwrap();
        assert!(client.resolve("relative/path", false).is_err());
        assert!(client.resolve("https://example.com/a", false).is_ok());
    }
}
