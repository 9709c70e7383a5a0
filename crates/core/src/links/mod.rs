//! Link directives and the ordered set they are collected into.
//!
//! A [`LinkSet`] is filled by contributors, deduplicated once, trimmed to a byte
//! budget and rendered as a single RFC 8288 style `Link` header value:
//!
//! ```text
//! </css/app.css>; rel="preload"; as="style",</js/app.js>; rel="modulepreload"; crossorigin="anonymous"
//! ```
//!
//! Insertion order is priority order: the budgeter evicts from the back.

mod budget;
mod parse;

pub use budget::budget;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// Value of a link attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// `true` renders as a bare attribute name, `false` is omitted.
    Flag(bool),
    /// Renders as `key="value"`.
    Text(String),
    /// Renders as one `key="value"` pair per item.
    List(Vec<String>),
}

impl AttrValue {
    /// The text value, if this is a [`AttrValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Flag(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

/// A single link directive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub uri: String,
    #[serde(default)]
    pub rels: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<(String, AttrValue)>,
    /// Templated links are carried but never serialized.
    #[serde(default)]
    pub templated: bool,
}

impl LinkEntry {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), ..Default::default() }
    }

    /// Add a relation. Empty and repeated relations are ignored.
    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        let rel = rel.into();
        if !rel.is_empty() && !self.rels.contains(&rel) {
            self.rels.push(rel);
        }
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn templated(mut self, templated: bool) -> Self {
        self.templated = templated;
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r == rel)
    }

    /// Relations as they appear inside the quoted `rel` value.
    pub fn relations(&self) -> String {
        self.rels.join(" ")
    }

    /// Identity used by [`LinkSet::make_unique`].
    ///
    /// Relation order is significant: `preload font` and `font preload` differ.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.uri.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.relations().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Render this entry, or `None` for templated links.
    pub fn to_header_value(&self) -> Option<String> {
        if self.templated {
            return None;
        }

        let mut out = format!("<{}>; rel=\"{}\"", self.uri, self.relations());
        for (key, value) in &self.attributes {
            match value {
                AttrValue::Text(v) => out.push_str(&format!("; {key}=\"{v}\"")),
                AttrValue::List(values) => {
                    for v in values {
                        out.push_str(&format!("; {key}=\"{v}\""));
                    }
                }
                AttrValue::Flag(true) => out.push_str(&format!("; {key}")),
                AttrValue::Flag(false) => {}
            }
        }

        Some(out)
    }
}

/// Ordered collection of link directives for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSet {
    links: Vec<LinkEntry>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: LinkEntry) -> &mut Self {
        self.links.push(entry);
        self
    }

    /// Add a link from its raw parts.
    ///
    /// Each relation string may hold several space separated relations. A link
    /// without any relation is not added.
    pub fn add_link<R, S, A>(&mut self, uri: impl Into<String>, rels: R, attributes: A) -> &mut Self
    where
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
        A: IntoIterator<Item = (String, AttrValue)>,
    {
        let mut entry = LinkEntry::new(uri);
        for rel in rels {
            for part in rel.as_ref().split_whitespace() {
                entry = entry.with_rel(part);
            }
        }

        if entry.rels.is_empty() {
            tracing::trace!(uri = %entry.uri, "ignoring link without relation");
            return self;
        }

        for (key, value) in attributes {
            entry.set_attribute(key, value);
        }

        self.add(entry)
    }

    /// Keep the first entry of every `(uri, relations)` identity.
    pub fn make_unique(&mut self) -> &mut Self {
        let mut seen = HashSet::new();
        let before = self.links.len();
        self.links.retain(|link| seen.insert(link.fingerprint()));

        if self.links.len() != before {
            tracing::trace!(removed = before - self.links.len(), "dropped duplicate links");
        }

        self
    }

    /// Remove the lowest priority entry.
    pub fn pop_last(&mut self) -> Option<LinkEntry> {
        self.links.pop()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LinkEntry> {
        self.links.iter()
    }

    pub fn links(&self) -> &[LinkEntry] {
        &self.links
    }

    /// Render every non-templated entry, comma separated.
    pub fn to_header_value(&self) -> String {
        self.links
            .iter()
            .filter_map(LinkEntry::to_header_value)
            .collect::<Vec<_>>()
            .join(",")
            .trim()
            .to_string()
    }
}

impl fmt::Display for LinkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

impl Extend<LinkEntry> for LinkSet {
    fn extend<T: IntoIterator<Item = LinkEntry>>(&mut self, iter: T) {
        self.links.extend(iter);
    }
}

impl FromIterator<LinkEntry> for LinkSet {
    fn from_iter<T: IntoIterator<Item = LinkEntry>>(iter: T) -> Self {
        Self { links: iter.into_iter().collect() }
    }
}

impl IntoIterator for LinkSet {
    type Item = LinkEntry;
    type IntoIter = std::vec::IntoIter<LinkEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a LinkEntry;
    type IntoIter = std::slice::Iter<'a, LinkEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
