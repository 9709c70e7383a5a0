//! Attaching generated `Link` values to final responses.

use http::header::{CONTENT_TYPE, LINK};
use http::{HeaderMap, HeaderValue, Response};

use crate::error::HintsError;

/// Add `value` to the response's `Link` header.
///
/// Existing `Link` values come first, joined with `,`. An empty `value`
/// leaves the response untouched.
pub fn attach_link_header<B>(response: &mut Response<B>, value: &str) -> Result<(), HintsError> {
    attach_to_headers(response.headers_mut(), value)
}

pub fn attach_to_headers(headers: &mut HeaderMap, value: &str) -> Result<(), HintsError> {
    if value.is_empty() {
        return Ok(());
    }

    let existing: Vec<&str> = headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .collect();

    let combined = if existing.is_empty() { value.to_string() } else { format!("{},{}", existing.join(","), value) };

    let header = HeaderValue::from_str(&combined).map_err(|e| HintsError::InvalidHeader(e.to_string()))?;
    headers.insert(LINK, header);
    Ok(())
}

/// Whether a response carries a document the pipeline can work with.
///
/// Responses without a content type are assumed to be HTML.
pub fn is_markup(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return true;
    };

    let essence = content_type
        .to_str()
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();

    essence.eq_ignore_ascii_case("text/html") || essence.eq_ignore_ascii_case("application/xhtml+xml")
}
