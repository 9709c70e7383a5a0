//! Parsing of raw `Link` header text.
//!
//! Input looks like `<uri>; rel="preload"; as="style", <uri2>; rel="preconnect"`.
//! Parsing never fails: tokens that are not `key=value` become flag
//! attributes and fragments without a `rel` are skipped.

use super::{AttrValue, LinkSet};

impl LinkSet {
    /// Parse one or more comma separated link fragments and add them in order.
    pub fn add_from_str(&mut self, text: &str) -> &mut Self {
        for fragment in text.trim().split(',') {
            let mut parts = fragment.trim().split("; ");
            let uri = parts.next().unwrap_or_default().trim_matches(['<', '>']);

            let mut rel = None;
            let mut attributes = Vec::new();
            for part in parts {
                let Some((key, value)) = split_token(part.trim()) else {
                    continue;
                };

                if key == "rel" {
                    rel = value;
                    continue;
                }

                attributes.push((key.to_string(), value.map(AttrValue::Text).unwrap_or(AttrValue::Flag(true))));
            }

            match rel {
                Some(rel) => {
                    self.add_link(uri, [rel], attributes);
                }
                None => tracing::debug!(fragment, "skipping link fragment without rel"),
            }
        }

        self
    }
}

/// Split `key="value"` into its parts. `None` for an empty token.
fn split_token(token: &str) -> Option<(&str, Option<String>)> {
    let (key, value) = match token.split_once('=') {
        Some((key, value)) => {
            let value = value.strip_prefix('"').unwrap_or(value).trim_end_matches('"');
            (key.trim(), (!value.is_empty()).then(|| value.to_string()))
        }
        None => (token, None),
    };

    (!key.is_empty()).then_some((key, value))
}
