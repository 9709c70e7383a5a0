//! The early-hints request lifecycle.
//!
//! ```text
//! request ─▶ eligible? ──no──▶ handler ─▶ response (untouched)
//!               │yes
//!               ▼
//!          cache lookup ──hit──▶ [103] ─▶ handler ─▶ attach cached header
//!               │miss
//!               ▼
//!            handler ─▶ generate now ─▶ store ─▶ attach
//!                    └▶ (deferred) respond ─▶ generate after the body is sent ─▶ store
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, HeaderValue, StatusCode};

use early_hints_core::{
    CacheRecord, Contributor, Contributors, DefaultHeaders, HintStore, HintsConfig, LinkSet, MemoryStore,
    ResponseView, ResultCache, open_store,
};
use early_hints_extract::BodyLinks;

use crate::attach::{attach_link_header, attach_to_headers, is_markup};
use crate::body::{Buffered, CompletionBody, buffer_body};
use crate::eligibility::{Eligibility, normalized_url};
use crate::error::HintsError;
use crate::informational::{CommitState, InformationalHandle, InformationalSender, Preliminary};

/// Early-hints middleware state, cheap to clone.
#[derive(Debug, Clone)]
pub struct EarlyHints {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: HintsConfig,
    contributors: Contributors,
    cache: ResultCache,
    size_limit: usize,
    sender: Option<InformationalHandle>,
}

/// Builder for [`EarlyHints`].
pub struct EarlyHintsBuilder {
    config: HintsConfig,
    contributors: Contributors,
    store: Option<Arc<dyn HintStore>>,
    size_limit: Option<usize>,
    sender: Option<InformationalHandle>,
}

impl EarlyHintsBuilder {
    /// Register a contributor. Earlier registrations win when the budget is tight.
    pub fn contributor(mut self, contributor: impl Contributor + 'static) -> Self {
        self.contributors.register(contributor);
        self
    }

    pub fn contributor_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut LinkSet, &Parts, &ResponseView<'_>) + Send + Sync + 'static,
    {
        self.contributors.register_fn(name, f);
        self
    }

    /// Register the configured default headers followed by the body scanner.
    pub fn standard_contributors(self) -> Result<Self, HintsError> {
        let defaults = DefaultHeaders::from_config(&self.config);
        let body = BodyLinks::from_config(&self.config)?;
        Ok(self.contributor(defaults).contributor(body))
    }

    pub fn store(mut self, store: Arc<dyn HintStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override `size_limit` for this instance.
    pub fn size_limit(mut self, limit: usize) -> Self {
        self.size_limit = Some(limit);
        self
    }

    /// Fallback sender used when the request carries no [`InformationalHandle`].
    pub fn informational_sender(mut self, sender: impl InformationalSender + 'static) -> Self {
        self.sender = Some(InformationalHandle::new(sender));
        self
    }

    pub fn build(self) -> EarlyHints {
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let size_limit = self.config.effective_size_limit(self.size_limit);
        let cache = ResultCache::new(store, self.config.cache_ttl());

        EarlyHints {
            inner: Arc::new(Inner {
                config: self.config,
                contributors: self.contributors,
                cache,
                size_limit,
                sender: self.sender,
            }),
        }
    }
}

impl EarlyHints {
    pub fn builder(config: HintsConfig) -> EarlyHintsBuilder {
        EarlyHintsBuilder { config, contributors: Contributors::new(), store: None, size_limit: None, sender: None }
    }

    /// Standard contributors and the store selected by `cache_driver`.
    pub async fn from_config(config: HintsConfig) -> Result<Self, HintsError> {
        let store = open_store(&config).await?;
        Ok(Self::builder(config).standard_contributors()?.store(store).build())
    }

    pub fn config(&self) -> &HintsConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    pub fn size_limit(&self) -> usize {
        self.inner.size_limit
    }

    /// Drop expired records from the store every `every`, for the life of the runtime.
    pub fn spawn_purge(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.inner.cache.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => tracing::debug!(purged, "purged expired early hints"),
                    Err(e) => tracing::warn!(driver = cache.driver(), error = %e, "failed to purge early hints"),
                }
            }
        })
    }

    /// Run `request` through `next`, adding early hints on the way.
    ///
    /// Never fails: every degraded state falls back to the plain response.
    pub async fn handle<F, Fut>(&self, request: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let head = request_head(&request);

        if let Eligibility::Skipped(reason) = Eligibility::check(&head, &self.inner.config) {
            tracing::debug!(path = head.uri.path(), %reason, "skipping early hints");
            return next(request).await;
        }

        let url = normalized_url(&head);
        match self.inner.cache.lookup(&url).await {
            Some(record) => self.replay(record, request, next).await,
            None => self.respond_and_generate(url, head, request, next).await,
        }
    }

    async fn replay<F, Fut>(&self, record: CacheRecord, request: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let header = record.header();
        tracing::debug!(url = %record.url, bytes = header.len(), "early hints cache hit");

        let mut commit = None;
        if self.inner.config.send_103 && !header.is_empty() {
            let handle = request.extensions().get::<InformationalHandle>().cloned();
            commit = self.send_preliminary(handle, &header).await;
        }

        let mut response = next(request).await;
        if is_markup(response.headers())
            && let Err(e) = attach_link_header(&mut response, &header)
        {
            tracing::warn!(url = %record.url, error = %e, "could not attach cached early hints");
        }

        if let Some(state) = commit {
            response.extensions_mut().insert(state);
        }

        response
    }

    /// Flush a 103 carrying `header` before the handler runs.
    ///
    /// The transport's `handle` takes precedence over the builder's sender.
    async fn send_preliminary(&self, handle: Option<InformationalHandle>, header: &str) -> Option<CommitState> {
        let Some(InformationalHandle(sender)) = handle.or_else(|| self.inner.sender.clone()) else {
            tracing::debug!("no informational sender available, skipping 103");
            return None;
        };

        let link = match HeaderValue::from_str(header) {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(error = %e, "cached early hints are not a valid header value");
                return None;
            }
        };

        let mut preliminary = Preliminary::new(link);
        match preliminary.send(sender.as_ref()).await {
            Ok(()) => tracing::debug!("sent 103 early hints"),
            Err(e) => tracing::warn!(error = %e, "failed to send 103 early hints"),
        }

        Some(preliminary.commit_state())
    }

    async fn respond_and_generate<F, Fut>(&self, url: String, head: Parts, request: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let response = next(request).await;
        if !should_generate(response.status(), response.headers()) {
            tracing::debug!(url = %url, status = %response.status(), "not generating early hints for response");
            return response;
        }

        let (mut parts, body) = response.into_parts();
        let bytes = match buffer_body(body, self.inner.config.max_body_bytes).await {
            Ok(Buffered::Complete(bytes)) => bytes,
            Ok(Buffered::Oversized(body)) => {
                tracing::debug!(url = %url, limit = self.inner.config.max_body_bytes, "response body too large to scan");
                return Response::from_parts(parts, body);
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to read response body");
                return e.into_response();
            }
        };

        if !self.inner.config.generate_during_request {
            let deferred = DeferredHints::new(self.clone(), head, parts.status, parts.headers.clone(), bytes.clone());
            return Response::from_parts(parts, Body::new(CompletionBody::new(bytes, deferred)));
        }

        let view = ResponseView::new(parts.status, &parts.headers, &bytes);
        let links = self.generate(&url, &head, &view).await;
        let header = links.to_header_value();

        if let Err(e) = attach_to_headers(&mut parts.headers, &header) {
            tracing::warn!(url = %url, error = %e, "could not attach early hints");
        }

        Response::from_parts(parts, Body::from(bytes))
    }

    /// Contribute, deduplicate, budget and cache the links for one response.
    pub async fn generate(&self, url: &str, request: &Parts, response: &ResponseView<'_>) -> LinkSet {
        let (links, header) = self.inner.contributors.generate(request, response, self.inner.size_limit);
        tracing::debug!(url, links = links.len(), bytes = header.len(), "generated early hints");

        self.inner.cache.store(url, &links).await;
        links
    }

    /// Post-response hook: generate and cache hints for a response that was already sent.
    ///
    /// Returns `None` when the request or response does not qualify.
    pub async fn terminate(&self, request: &Parts, response: &ResponseView<'_>) -> Option<LinkSet> {
        if !Eligibility::check(request, &self.inner.config).is_eligible()
            || !should_generate(response.status, response.headers)
        {
            return None;
        }

        Some(self.generate(&normalized_url(request), request, response).await)
    }
}

/// Generation work held back until the response body has been sent.
pub struct DeferredHints {
    hints: EarlyHints,
    request: Parts,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl DeferredHints {
    pub fn new(hints: EarlyHints, request: Parts, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self { hints, request, status, headers, body }
    }

    pub async fn run(self) {
        let view = ResponseView::new(self.status, &self.headers, &self.body);
        if self.hints.terminate(&self.request, &view).await.is_none() {
            tracing::debug!(path = self.request.uri.path(), "deferred early hints not generated");
        }
    }
}

/// Successful, non-redirect markup responses are the only ones worth scanning.
fn should_generate(status: StatusCode, headers: &HeaderMap) -> bool {
    status.is_success() && !status.is_redirection() && is_markup(headers)
}

/// A copy of the request head, detached from its body and extensions.
fn request_head(request: &Request) -> Parts {
    let mut head = http::Request::new(());
    *head.method_mut() = request.method().clone();
    *head.uri_mut() = request.uri().clone();
    *head.version_mut() = request.version();
    *head.headers_mut() = request.headers().clone();
    head.into_parts().0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCEPT, LINK};

    const PAGE: &str = r#"<html><head><link rel="stylesheet" href="/css/test.css"></head><body></body></html>"#;

    fn hints() -> EarlyHints {
        EarlyHints::builder(HintsConfig::default()).standard_contributors().unwrap().build()
    }

    fn request(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn page(_request: Request) -> Response {
        Response::new(Body::from(PAGE))
    }

    #[tokio::test]
    async fn test_miss_generates_and_attaches() {
        let hints = hints();
        let response = hints.handle(request("http://example.com/"), page).await;

        assert_eq!(response.headers()[LINK], r#"</css/test.css>; rel="preload"; as="style""#);
        assert!(hints.cache().lookup("http://example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_skipped_request_is_untouched() {
        let hints = hints();
        let request = http::Request::builder()
            .uri("http://example.com/")
            .header(ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();

        let response = hints.handle(request, page).await;

        assert!(response.headers().get(LINK).is_none());
        assert!(hints.cache().lookup("http://example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_generate_dedups_and_budgets() {
        let hints = EarlyHints::builder(HintsConfig::default())
            .contributor_fn("dupes", |links, _, _| {
                links.add_from_str(r#"</a.css>; rel="preload"; as="style""#);
                links.add_from_str(r#"</a.css>; rel="preload"; as="style""#);
                links.add_from_str(r#"</b.css>; rel="preload"; as="style""#);
            })
            .size_limit(40)
            .build();

        let head = http::Request::new(()).into_parts().0;
        let headers = HeaderMap::new();
        let view = ResponseView::new(StatusCode::OK, &headers, b"");
        let links = hints.generate("http://example.com", &head, &view).await;

        assert_eq!(links.to_header_value(), r#"</a.css>; rel="preload"; as="style""#);
    }

    #[tokio::test]
    async fn test_terminate_ignores_redirects() {
        let hints = hints();
        let head = http::Request::builder().uri("http://example.com/").body(()).unwrap().into_parts().0;
        let headers = HeaderMap::new();
        let view = ResponseView::new(StatusCode::FOUND, &headers, PAGE.as_bytes());

        assert!(hints.terminate(&head, &view).await.is_none());
        assert!(hints.cache().lookup("http://example.com").await.is_none());
    }

    #[test]
    fn test_request_head_copies_headers() {
        let request = http::Request::builder()
            .uri("https://example.com/a?b=c")
            .header(ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap();

        let head = request_head(&request);
        assert_eq!(head.uri, "https://example.com/a?b=c");
        assert_eq!(head.headers[ACCEPT], "text/html");
    }

    #[tokio::test]
    async fn test_purge_task_evicts_expired_records() {
        let store = MemoryStore::new();
        let hints = EarlyHints::builder(HintsConfig::default()).store(Arc::new(store.clone())).build();
        store.put("stale", "{}", Duration::ZERO).await.unwrap();

        let task = hints.spawn_purge(Duration::from_millis(10));
        for _ in 0..50 {
            if store.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();

        assert!(store.is_empty().await);
    }

    #[test]
    fn test_should_generate() {
        let headers = HeaderMap::new();
        assert!(should_generate(StatusCode::OK, &headers));
        assert!(!should_generate(StatusCode::MOVED_PERMANENTLY, &headers));
        assert!(!should_generate(StatusCode::NOT_FOUND, &headers));
    }
}
