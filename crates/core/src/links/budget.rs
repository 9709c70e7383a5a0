//! Byte budget for the serialized header.

use super::LinkSet;

/// Drop entries from the back of `links` until the serialized value fits in
/// `limit` bytes, and return that value.
///
/// A limit of zero is treated as one. The empty set serializes to the empty
/// string, so the loop always terminates.
pub fn budget(links: &mut LinkSet, limit: usize) -> String {
    let limit = limit.max(1);
    let mut header = links.to_header_value();

    while header.len() > limit {
        let Some(dropped) = links.pop_last() else {
            break;
        };
        tracing::trace!(uri = %dropped.uri, limit, "link dropped to fit size limit");
        header = links.to_header_value();
    }

    header
}
