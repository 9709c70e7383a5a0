//! Relation and destination rules for candidate links.

/// Value of the `as` attribute for a preloaded resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Style,
    Script,
    Image,
    Font,
    Fetch,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Style => "style",
            Destination::Script => "script",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Fetch => "fetch",
        }
    }

    /// Destination implied by the extension in `url`, if any.
    ///
    /// The match is a case-insensitive substring search and the first entry
    /// wins, so `/data.json` resolves to `script` through `.js`.
    pub fn for_url(url: &str) -> Option<Self> {
        let upper = url.to_uppercase();
        LINK_TYPES
            .iter()
            .find(|(extension, _)| upper.contains(extension))
            .map(|(_, destination)| *destination)
    }
}

const LINK_TYPES: &[(&str, Destination)] = &[
    (".CSS", Destination::Style),
    (".JS", Destination::Script),
    (".BMP", Destination::Image),
    (".GIF", Destination::Image),
    (".JPG", Destination::Image),
    (".JPEG", Destination::Image),
    (".PNG", Destination::Image),
    (".SVG", Destination::Image),
    (".TIFF", Destination::Image),
    (".WEBP", Destination::Image),
    (".WOFF", Destination::Font),
    (".WOFF2", Destination::Font),
];

/// Relation of a generated link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Preload,
    Preconnect,
    ModulePreload,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Preload => "preload",
            Relation::Preconnect => "preconnect",
            Relation::ModulePreload => "modulepreload",
        }
    }

    /// Relation for an element with the given `rel` and `type` attributes.
    ///
    /// `type="module"` always means `modulepreload`. Other than `preconnect`,
    /// every `rel` value (`modulepreload` included) collapses to `preload`.
    pub fn for_element(rel: Option<&str>, media_type: Option<&str>) -> Self {
        if media_type.is_some_and(|t| t.eq_ignore_ascii_case("module")) {
            return Relation::ModulePreload;
        }

        match rel.map(str::trim) {
            Some(rel) if rel.eq_ignore_ascii_case("preconnect") => Relation::Preconnect,
            _ => Relation::Preload,
        }
    }

    /// Module fetches always run in CORS mode and need `crossorigin`.
    pub fn requires_cors(self) -> bool {
        self == Relation::ModulePreload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_for_common_extensions() {
        assert_eq!(Destination::for_url("/css/app.css"), Some(Destination::Style));
        assert_eq!(Destination::for_url("/js/app.js"), Some(Destination::Script));
        assert_eq!(Destination::for_url("/img/logo.PNG"), Some(Destination::Image));
        assert_eq!(Destination::for_url("/img/photo.jpeg?w=200"), Some(Destination::Image));
        assert_eq!(Destination::for_url("/fonts/inter.woff2"), Some(Destination::Font));
        assert_eq!(Destination::for_url("/api/resource"), None);
    }

    #[test]
    fn test_destination_first_match_wins() {
        assert_eq!(Destination::for_url("/data.json"), Some(Destination::Script));
        assert_eq!(Destination::for_url("/styles.css.js"), Some(Destination::Style));
    }

    #[test]
    fn test_relation_for_element() {
        assert_eq!(Relation::for_element(Some("stylesheet"), None), Relation::Preload);
        assert_eq!(Relation::for_element(Some("preload"), None), Relation::Preload);
        assert_eq!(Relation::for_element(Some("preconnect"), None), Relation::Preconnect);
        assert_eq!(Relation::for_element(Some("modulepreload"), None), Relation::Preload);
        assert_eq!(Relation::for_element(None, None), Relation::Preload);
    }

    #[test]
    fn test_module_type_wins_over_rel() {
        assert_eq!(Relation::for_element(Some("preconnect"), Some("module")), Relation::ModulePreload);
        assert_eq!(Relation::for_element(None, Some("text/javascript")), Relation::Preload);
    }
}
