//! Request eligibility and URL normalization.

use early_hints_core::HintsConfig;
use http::header::{ACCEPT, HOST};
use http::request::Parts;

/// Response format a request asks for, derived from `Accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Html,
    Txt,
    Js,
    Css,
    Json,
    JsonLd,
    Xml,
    Rdf,
    Atom,
    Rss,
    Form,
}

const FORMATS: &[(&str, RequestFormat)] = &[
    ("text/html", RequestFormat::Html),
    ("application/xhtml+xml", RequestFormat::Html),
    ("text/plain", RequestFormat::Txt),
    ("application/javascript", RequestFormat::Js),
    ("application/x-javascript", RequestFormat::Js),
    ("text/javascript", RequestFormat::Js),
    ("text/css", RequestFormat::Css),
    ("application/json", RequestFormat::Json),
    ("application/x-json", RequestFormat::Json),
    ("application/ld+json", RequestFormat::JsonLd),
    ("text/xml", RequestFormat::Xml),
    ("application/xml", RequestFormat::Xml),
    ("application/x-xml", RequestFormat::Xml),
    ("application/rdf+xml", RequestFormat::Rdf),
    ("application/atom+xml", RequestFormat::Atom),
    ("application/rss+xml", RequestFormat::Rss),
    ("application/x-www-form-urlencoded", RequestFormat::Form),
    ("multipart/form-data", RequestFormat::Form),
];

impl RequestFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestFormat::Html => "html",
            RequestFormat::Txt => "txt",
            RequestFormat::Js => "js",
            RequestFormat::Css => "css",
            RequestFormat::Json => "json",
            RequestFormat::JsonLd => "jsonld",
            RequestFormat::Xml => "xml",
            RequestFormat::Rdf => "rdf",
            RequestFormat::Atom => "atom",
            RequestFormat::Rss => "rss",
            RequestFormat::Form => "form",
        }
    }

    /// Format of a single media type, parameters ignored.
    pub fn for_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        FORMATS
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
            .map(|(_, format)| *format)
    }

    /// The first recognised format in quality order; `html` when nothing matches.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return RequestFormat::Html;
        };

        let mut ranges: Vec<(&str, f32)> = accept
            .split(',')
            .map(str::trim)
            .filter(|range| !range.is_empty())
            .map(|range| (range, quality(range)))
            .filter(|(_, q)| *q > 0.0)
            .collect();
        ranges.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranges
            .into_iter()
            .find_map(|(range, _)| Self::for_media_type(range))
            .unwrap_or(RequestFormat::Html)
    }

    pub fn for_request(parts: &Parts) -> Self {
        Self::from_accept(parts.headers.get(ACCEPT).and_then(|v| v.to_str().ok()))
    }
}

fn quality(range: &str) -> f32 {
    range
        .split(';')
        .skip(1)
        .filter_map(|param| param.trim().strip_prefix("q="))
        .find_map(|q| q.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}

/// Why a request bypasses the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotHtml(RequestFormat),
    Extension(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotHtml(format) => write!(f, "request format is {}", format.as_str()),
            SkipReason::Extension(ext) => write!(f, "extension {ext:?} is not allowed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Skipped(SkipReason),
}

impl Eligibility {
    /// Gate a request on its format and the extension of its last path segment.
    pub fn check(parts: &Parts, config: &HintsConfig) -> Self {
        let format = RequestFormat::for_request(parts);
        if format != RequestFormat::Html {
            return Eligibility::Skipped(SkipReason::NotHtml(format));
        }

        if let Some(extension) = path_extension(parts.uri.path())
            && !config.allows_extension(extension)
        {
            return Eligibility::Skipped(SkipReason::Extension(extension.to_string()));
        }

        Eligibility::Eligible
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Extension of the last path segment, if that segment contains a dot.
///
/// `/archive.tar.gz` yields `gz`, `/file.` yields an empty extension.
pub fn path_extension(path: &str) -> Option<&str> {
    let last = path.trim_matches('/').rsplit('/').next().unwrap_or_default();
    last.rsplit_once('.').map(|(_, ext)| ext)
}

/// Scheme, authority and path of the request, without query or trailing slash.
///
/// This is the identity the result cache is keyed on.
pub fn normalized_url(parts: &Parts) -> String {
    let scheme = parts.uri.scheme_str().unwrap_or("http");
    let authority = parts
        .uri
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            parts
                .headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "localhost".to_string());

    let url = format!("{}://{}{}", scheme, authority.to_ascii_lowercase(), parts.uri.path());
    url.trim_end_matches('/').to_string()
}
