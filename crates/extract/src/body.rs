//! The contributor that turns response bodies into links.

use early_hints_core::{Contributor, Error, HintsConfig, LinkSet, ResponseView};
use http::request::Parts;

use crate::candidates::CandidateExtractor;
use crate::filter::ExcludeFilter;
use crate::urls::BasePath;

/// Adds a link for every linkable element of an HTML response body.
#[derive(Debug, Clone, Default)]
pub struct BodyLinks {
    extractor: CandidateExtractor,
    filter: ExcludeFilter,
}

impl BodyLinks {
    pub fn new(extractor: CandidateExtractor, filter: ExcludeFilter) -> Self {
        Self { extractor, filter }
    }

    /// Build from `base_path` and `exclude_keywords`.
    pub fn from_config(config: &HintsConfig) -> Result<Self, Error> {
        Ok(Self::new(
            CandidateExtractor::new(BasePath::new(&config.base_path)),
            ExcludeFilter::new(&config.exclude_keywords)?,
        ))
    }

    /// Candidates for `html`, with excluded URLs removed.
    pub fn links_for(&self, html: &str) -> LinkSet {
        self.extractor
            .extract(html)
            .into_iter()
            .filter(|link| {
                let excluded = self.filter.is_excluded(&link.uri);
                if excluded {
                    tracing::trace!(uri = %link.uri, "excluded by keyword");
                }
                !excluded
            })
            .collect()
    }
}

impl Contributor for BodyLinks {
    fn contribute(&self, links: &mut LinkSet, _request: &Parts, response: &ResponseView<'_>) {
        if response.body.is_empty() {
            return;
        }

        links.extend(self.links_for(&response.body_text()));
    }

    fn name(&self) -> &str {
        "body_links"
    }
}
