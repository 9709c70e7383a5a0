//! Keyword based exclusion of candidate URLs.

use early_hints_core::Error;
use regex::{Regex, RegexBuilder};

/// Drops URLs that contain any configured keyword, ignoring case.
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    pattern: Option<Regex>,
}

impl ExcludeFilter {
    /// Build a filter from literal keywords. Empty keywords are ignored.
    pub fn new<I, S>(keywords: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = keywords
            .into_iter()
            .filter(|k| !k.as_ref().is_empty())
            .map(|k| regex::escape(k.as_ref()))
            .collect();

        if escaped.is_empty() {
            return Ok(Self::default());
        }

        let pattern = RegexBuilder::new(&format!("({})", escaped.join("|")))
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;

        Ok(Self { pattern: Some(pattern) })
    }

    pub fn is_excluded(&self, uri: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(uri))
    }
}
