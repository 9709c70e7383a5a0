//! Rewriting of candidate URLs.

use regex::Regex;
use std::sync::LazyLock;

static ABSOLUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([a-z][a-z0-9+.\-]*:)?//").expect("invalid absolute url pattern"));

/// Whether `url` carries a scheme or is protocol relative.
pub fn is_absolute(url: &str) -> bool {
    ABSOLUTE.is_match(url)
}

/// Prefix applied to relative resource URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath(String);

impl BasePath {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rewrite `url` so it resolves independently of the request path.
    ///
    /// Absolute URLs pass through. Relative URLs are placed under the base
    /// path (a leading copy of the base is not repeated) and lose any
    /// trailing slash, so `/` resolves to the empty string.
    pub fn resolve(&self, url: &str) -> String {
        if is_absolute(url) {
            return url.to_string();
        }

        let base = self.0.trim_end_matches('/');
        let rest = match url.strip_prefix(base) {
            Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => url,
        };

        format!("{base}/{}", rest.trim_start_matches('/'))
            .trim_end_matches('/')
            .to_string()
    }
}

impl Default for BasePath {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_absolute() {
        assert!(is_absolute("https://cdn.example.com/app.js"));
        assert!(is_absolute("HTTP://cdn.example.com/app.js"));
        assert!(is_absolute("//cdn.example.com/app.js"));
        assert!(!is_absolute("/css/app.css"));
        assert!(!is_absolute("css/app.css"));
        assert!(!is_absolute("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_absolute_passes_through() {
        let base = BasePath::new("/shop/");
        assert_eq!(base.resolve("https://cdn.example.com/a.css/"), "https://cdn.example.com/a.css/");
    }

    #[test]
    fn test_default_base() {
        let base = BasePath::default();
        assert_eq!(base.resolve("/css/test.css"), "/css/test.css");
        assert_eq!(base.resolve("css/test.css"), "/css/test.css");
        assert_eq!(base.resolve("/api/resource/"), "/api/resource");
    }

    #[test]
    fn test_root_resolves_empty() {
        assert_eq!(BasePath::default().resolve("/"), "");
    }

    #[test]
    fn test_custom_base() {
        let base = BasePath::new("/shop/");
        assert_eq!(base.resolve("/css/app.css"), "/shop/css/app.css");
        assert_eq!(base.resolve("/shop/css/app.css"), "/shop/css/app.css");
        assert_eq!(base.resolve("/shopping.css"), "/shop/shopping.css");
    }

    #[test]
    fn test_origin_base() {
        let base = BasePath::new("https://static.example.com");
        assert_eq!(base.resolve("/img/logo.png"), "https://static.example.com/img/logo.png");
    }
}
