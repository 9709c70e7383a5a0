//! Candidate harvesting from HTML documents.

use std::sync::LazyLock;

use early_hints_core::LinkEntry;
use scraper::{ElementRef, Html, Selector};

use crate::classify::{Destination, Relation};
use crate::urls::BasePath;

/// Elements that reference render-relevant sub-resources.
///
/// Icons, canonical/manifest/alternate links, deferred or async scripts, lazy
/// images and images inside `<picture>` are left out.
const LINKABLE: &str = concat!(
    r#"link:not([rel*="icon"]):not([rel="canonical"]):not([rel="manifest"]):not([rel="alternate"]), "#,
    r#"script[src]:not([defer]):not([async]), "#,
    r#"*:not(picture) > img[src]:not([loading="lazy"]), "#,
    r#"object[data]"#,
);

static LINKABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse(LINKABLE).expect("invalid selector"));

/// Attributes holding the resource URL, in the order candidates are emitted.
const TARGET_ATTRS: [&str; 3] = ["href", "src", "data"];

/// Attributes copied onto the generated link, in output order.
const PASSTHROUGH_ATTRS: [&str; 7] = [
    "crossorigin",
    "as",
    "fetchpriority",
    "integrity",
    "referrerpolicy",
    "imagesizes",
    "imagesrcset",
];

/// The interesting attributes of one matched element.
///
/// Empty attribute values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkableNode {
    /// Non-empty `href`, `src` and `data` values, in that order.
    pub targets: Vec<String>,
    pub rel: Option<String>,
    /// The element's `type` attribute.
    pub media_type: Option<String>,
    pub attributes: Vec<(&'static str, String)>,
}

impl LinkableNode {
    fn from_element(element: ElementRef<'_>) -> Self {
        let value = |name: &str| element.value().attr(name).map(str::trim).filter(|v| !v.is_empty());

        Self {
            targets: TARGET_ATTRS.iter().filter_map(|name| value(name)).map(str::to_string).collect(),
            rel: value("rel").map(str::to_string),
            media_type: value("type").map(str::to_string),
            attributes: PASSTHROUGH_ATTRS
                .iter()
                .filter_map(|name| value(name).map(|v| (*name, v.to_string())))
                .collect(),
        }
    }

    pub fn relation(&self) -> Relation {
        Relation::for_element(self.rel.as_deref(), self.media_type.as_deref())
    }

    /// Whether the element itself declares `rel="modulepreload"`.
    fn declares_module(&self) -> bool {
        self.rel.as_deref().is_some_and(|rel| rel.trim().eq_ignore_ascii_case("modulepreload"))
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(k, _)| *k == name)
    }
}

/// Collect every linkable element of `html` in document order.
pub fn linkable_nodes(html: &str) -> Vec<LinkableNode> {
    let document = Html::parse_document(html);
    document.select(&LINKABLE_SELECTOR).map(LinkableNode::from_element).collect()
}

/// Builds preload candidates from rendered pages.
#[derive(Debug, Clone, Default)]
pub struct CandidateExtractor {
    base_path: BasePath,
}

impl CandidateExtractor {
    pub fn new(base_path: BasePath) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    /// Extract candidate links from `html`, in document order.
    ///
    /// Empty documents and documents without linkable elements yield nothing.
    pub fn extract(&self, html: &str) -> Vec<LinkEntry> {
        if html.trim().is_empty() {
            return Vec::new();
        }

        linkable_nodes(html).iter().flat_map(|node| self.links_for_node(node)).collect()
    }

    /// One candidate per target URL of `node`.
    pub fn links_for_node(&self, node: &LinkableNode) -> Vec<LinkEntry> {
        let relation = node.relation();

        let mut attributes = node.attributes.clone();
        if (relation.requires_cors() || node.declares_module()) && !node.has_attribute("crossorigin") {
            attributes.insert(0, ("crossorigin", "anonymous".to_string()));
        }

        node.targets
            .iter()
            .filter_map(|target| self.build_link(target, relation, &attributes))
            .collect()
    }

    /// Build a single link, or `None` when the URL resolves to nothing.
    fn build_link(&self, url: &str, relation: Relation, attributes: &[(&'static str, String)]) -> Option<LinkEntry> {
        if url.is_empty() {
            return None;
        }

        let destination = Destination::for_url(url);
        let uri = self.base_path.resolve(url);
        if uri.is_empty() {
            return None;
        }

        let mut link = LinkEntry::new(uri).with_rel(relation.as_str());
        for (key, value) in attributes {
            link.set_attribute(*key, value.as_str());
        }

        if relation == Relation::Preconnect {
            return Some(link);
        }

        if link.attribute("as").is_none() {
            link.set_attribute("as", destination.unwrap_or(Destination::Fetch).as_str());
        }

        if destination == Some(Destination::Font) && link.attribute("crossorigin").is_none() {
            link.set_attribute("crossorigin", "anonymous");
        }

        Some(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use early_hints_core::LinkSet;

    fn header_for(html: &str) -> String {
        CandidateExtractor::default()
            .extract(html)
            .into_iter()
            .collect::<LinkSet>()
            .to_header_value()
    }

    #[test]
    fn test_stylesheet() {
        let html = r#"<html><head><link rel="stylesheet" href="/css/test.css"></head><body></body></html>"#;
        assert_eq!(header_for(html), r#"</css/test.css>; rel="preload"; as="style""#);
    }

    #[test]
    fn test_blocking_script() {
        let html = r#"<html><body><script src="/js/test.js"></script></body></html>"#;
        assert_eq!(header_for(html), r#"</js/test.js>; rel="preload"; as="script""#);
    }

    #[test]
    fn test_deferred_and_async_scripts_are_skipped() {
        let html = r#"
            <html><body>
                <script src="/js/deferred.js" defer></script>
                <script src="/js/async.js" async></script>
                <script>console.log('inline');</script>
            </body></html>
        "#;
        assert_eq!(header_for(html), "");
    }

    #[test]
    fn test_module_script_gets_crossorigin() {
        let html = r#"<html><body><script type="module" src="/js/app.js"></script></body></html>"#;
        assert_eq!(
            header_for(html),
            r#"</js/app.js>; rel="modulepreload"; crossorigin="anonymous"; as="script""#
        );
    }

    #[test]
    fn test_module_script_keeps_explicit_crossorigin() {
        let html =
            r#"<html><body><script type="module" crossorigin="use-credentials" src="/js/app.js"></script></body></html>"#;
        assert_eq!(
            header_for(html),
            r#"</js/app.js>; rel="modulepreload"; crossorigin="use-credentials"; as="script""#
        );
    }

    #[test]
    fn test_modulepreload_link_collapses_to_preload_with_crossorigin() {
        let html = r#"<html><head><link rel="modulepreload" href="/js/chunk.js"></head></html>"#;
        assert_eq!(
            header_for(html),
            r#"</js/chunk.js>; rel="preload"; crossorigin="anonymous"; as="script""#
        );
    }

    #[test]
    fn test_icons_and_meta_links_are_skipped() {
        let html = r#"
            <html><head>
                <link rel="icon" href="/favicon.ico">
                <link rel="shortcut icon" href="/favicon.png">
                <link rel="apple-touch-icon" href="/touch.png">
                <link rel="canonical" href="https://example.com/">
                <link rel="manifest" href="/site.webmanifest">
                <link rel="alternate" hreflang="nl" href="https://example.com/nl">
            </head></html>
        "#;
        assert_eq!(header_for(html), "");
    }

    #[test]
    fn test_images() {
        let html = r#"
            <html><body>
                <img src="/img/a.jpg">
                <img src="/img/b.png" loading="eager">
                <img src="/img/lazy.png" loading="lazy">
                <picture>
                    <source srcset="/img/c.webp" type="image/webp">
                    <img src="/img/c.jpg">
                </picture>
                <div><img src="/img/d.svg"></div>
                <img alt="no source">
            </body></html>
        "#;

        let links = CandidateExtractor::default().extract(html);
        let uris: Vec<_> = links.iter().map(|l| l.uri.as_str()).collect();
        assert_eq!(uris, vec!["/img/a.jpg", "/img/b.png", "/img/d.svg"]);
        assert!(links.iter().all(|l| l.attribute("as").and_then(|a| a.as_text()) == Some("image")));
    }

    #[test]
    fn test_svg_object() {
        let html = r#"<html><body><object data="/img/drawing.svg" type="image/svg+xml"></object></body></html>"#;
        assert_eq!(header_for(html), r#"</img/drawing.svg>; rel="preload"; as="image""#);
    }

    #[test]
    fn test_fetch_preload_keeps_explicit_as() {
        let html = r#"<html><head><link rel="preload" href="/api/resource" as="script"></head></html>"#;
        assert_eq!(header_for(html), r#"</api/resource>; rel="preload"; as="script""#);
    }

    #[test]
    fn test_unknown_extension_defaults_to_fetch() {
        let html = r#"<html><head><link rel="preload" href="/api/resource"></head></html>"#;
        assert_eq!(header_for(html), r#"</api/resource>; rel="preload"; as="fetch""#);
    }

    #[test]
    fn test_font_gets_crossorigin() {
        let html = r#"<html><head><link rel="preload" href="/fonts/inter.woff2"></head></html>"#;
        assert_eq!(
            header_for(html),
            r#"</fonts/inter.woff2>; rel="preload"; as="font"; crossorigin="anonymous""#
        );
    }

    #[test]
    fn test_preconnect_has_no_as() {
        let html = r#"<html><head><link rel="preconnect" href="https://fonts.example.com" crossorigin="anonymous"></head></html>"#;
        assert_eq!(header_for(html), r#"<https://fonts.example.com>; rel="preconnect"; crossorigin="anonymous""#);
    }

    #[test]
    fn test_passthrough_attributes_in_order() {
        let html = r#"
            <html><head>
                <link rel="preload" href="/img/hero.webp" as="image" fetchpriority="high"
                      imagesrcset="/img/hero-2x.webp 2x" imagesizes="100vw" integrity="sha384-abc"
                      referrerpolicy="no-referrer">
            </head></html>
        "#;
        assert_eq!(
            header_for(html),
            r#"</img/hero.webp>; rel="preload"; as="image"; fetchpriority="high"; integrity="sha384-abc"; referrerpolicy="no-referrer"; imagesizes="100vw"; imagesrcset="/img/hero-2x.webp 2x""#
        );
    }

    #[test]
    fn test_empty_attributes_are_ignored() {
        let html = r#"<html><head><link rel="stylesheet" href="/css/a.css" crossorigin="" as=""></head></html>"#;
        assert_eq!(header_for(html), r#"</css/a.css>; rel="preload"; as="style""#);
    }

    #[test]
    fn test_link_without_target_is_dropped() {
        let html = r#"<html><head><link rel="stylesheet"><link rel="stylesheet" href="/"></head></html>"#;
        assert_eq!(header_for(html), "");
    }

    #[test]
    fn test_base_path_applies_to_relative_urls() {
        let extractor = CandidateExtractor::new(BasePath::new("/shop/"));
        let links = extractor.extract(
            r#"<html><head><link rel="stylesheet" href="css/a.css"><script src="https://cdn.example.com/b.js"></script></head></html>"#,
        );

        assert_eq!(links[0].uri, "/shop/css/a.css");
        assert_eq!(links[1].uri, "https://cdn.example.com/b.js");
    }

    #[test]
    fn test_empty_document() {
        assert!(CandidateExtractor::default().extract("").is_empty());
        assert!(CandidateExtractor::default().extract("<html><body><p>Hello</p></body></html>").is_empty());
    }

    #[test]
    fn test_linkable_nodes_capture_attributes() {
        let nodes = linkable_nodes(r#"<html><head><script type="module" src="/m.js" integrity="sha-x"></script></head></html>"#);

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].targets, vec!["/m.js"]);
        assert_eq!(nodes[0].media_type.as_deref(), Some("module"));
        assert_eq!(nodes[0].attributes, vec![("integrity", "sha-x".to_string())]);
        assert_eq!(nodes[0].relation(), Relation::ModulePreload);
    }
}
