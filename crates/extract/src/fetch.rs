//! Page fetching for offline inspection.
//!
//! The middleware never fetches anything; this is used by tooling that wants
//! to run the candidate pipeline against a live page.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};

use early_hints_core::Error;

/// Configuration for the page fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "early-hints/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "early-hints/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// A fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL after redirects
    pub url: Url,
    pub status: StatusCode,
    pub headers: header::HeaderMap,
    pub body: Bytes,
    pub fetch_ms: u64,
}

impl FetchedPage {
    /// Content-Type header, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client for downloading pages.
pub struct PageFetcher {
    http: Client,
    config: FetchConfig,
}

impl PageFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch `url`, rejecting non-success statuses and oversized bodies.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, Error> {
        let start = Instant::now();
        let url = parse_url(url)?;

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| Error::FetchFailed(format!("network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::FetchFailed(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", url, final_url, fetch_ms, body.len());

        Ok(FetchedPage { url: final_url, status, headers, body, fetch_ms })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Parse an http(s) URL, defaulting the scheme to `https`.
pub fn parse_url(input: &str) -> Result<Url, Error> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidUrl("empty URL".to_string()));
    }

    let candidate = if input.contains("://") { input.to_string() } else { format!("https://{}", input) };
    let url = Url::parse(&candidate).map_err(|e| Error::InvalidUrl(format!("{}: {}", input, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl(format!("unsupported scheme: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "early-hints/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(parse_url("example.com/page").unwrap().as_str(), "https://example.com/page");
        assert_eq!(parse_url(" http://example.com ").unwrap().as_str(), "http://example.com/");
        assert!(matches!(parse_url(""), Err(Error::InvalidUrl(_))));
        assert!(matches!(parse_url("ftp://example.com"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_fetched_page_accessors() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/html; charset=utf-8".parse().unwrap());
        let page = FetchedPage {
            url: Url::parse("https://example.com").unwrap(),
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(b"<html></html>"),
            fetch_ms: 12,
        };

        assert_eq!(page.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(page.body_text(), "<html></html>");
    }

    #[tokio::test]
    async fn test_page_fetcher_new() {
        assert!(PageFetcher::new(FetchConfig::default()).is_ok());
    }
}
