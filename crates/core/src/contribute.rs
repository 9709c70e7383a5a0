//! Contribution hooks.
//!
//! Every contributor receives the mutable [`LinkSet`] together with the
//! request and the real response, before deduplication and budgeting run.
//! Contributors are invoked in registration order, and since the budgeter
//! evicts from the back, registration order is also priority order.

use std::borrow::Cow;
use std::sync::Arc;

use http::{HeaderMap, StatusCode, request::Parts};

use crate::config::HintsConfig;
use crate::links::{LinkSet, budget};

/// Read-only view of the real response handed to contributors.
#[derive(Debug, Clone, Copy)]
pub struct ResponseView<'a> {
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

impl<'a> ResponseView<'a> {
    pub fn new(status: StatusCode, headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self { status, headers, body }
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.body)
    }
}

/// Something that adds links for a response.
pub trait Contributor: Send + Sync {
    fn contribute(&self, links: &mut LinkSet, request: &Parts, response: &ResponseView<'_>);

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter that lets a plain closure act as a [`Contributor`].
pub struct FnContributor<F> {
    name: String,
    f: F,
}

impl<F> Contributor for FnContributor<F>
where
    F: Fn(&mut LinkSet, &Parts, &ResponseView<'_>) + Send + Sync,
{
    fn contribute(&self, links: &mut LinkSet, request: &Parts, response: &ResponseView<'_>) {
        (self.f)(links, request, response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered registry of contributors.
#[derive(Clone, Default)]
pub struct Contributors {
    inner: Vec<Arc<dyn Contributor>>,
}

impl Contributors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, contributor: impl Contributor + 'static) -> &mut Self {
        self.inner.push(Arc::new(contributor));
        self
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut LinkSet, &Parts, &ResponseView<'_>) + Send + Sync + 'static,
    {
        self.register(FnContributor { name: name.into(), f })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Run every contributor against `links`, in registration order.
    pub fn run(&self, links: &mut LinkSet, request: &Parts, response: &ResponseView<'_>) {
        for contributor in &self.inner {
            let before = links.len();
            contributor.contribute(links, request, response);
            tracing::trace!(
                contributor = contributor.name(),
                added = links.len().saturating_sub(before),
                "contributor finished"
            );
        }
    }

    /// Contribute, deduplicate and trim to `size_limit` bytes.
    ///
    /// Returns the surviving links and their serialized header value.
    pub fn generate(&self, request: &Parts, response: &ResponseView<'_>, size_limit: usize) -> (LinkSet, String) {
        let mut links = LinkSet::new();
        self.run(&mut links, request, response);
        links.make_unique();
        let header = budget(&mut links, size_limit);
        (links, header)
    }
}

impl std::fmt::Debug for Contributors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.inner.iter().map(|c| c.name())).finish()
    }
}

/// Contributes the operator's `default_headers` on every response.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: Vec<String>,
}

impl DefaultHeaders {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers }
    }

    pub fn from_config(config: &HintsConfig) -> Self {
        Self::new(config.default_headers.clone())
    }
}

impl Contributor for DefaultHeaders {
    fn contribute(&self, links: &mut LinkSet, _request: &Parts, _response: &ResponseView<'_>) {
        for header in &self.headers {
            links.add_from_str(header);
        }
    }

    fn name(&self) -> &str {
        "default_headers"
    }
}
