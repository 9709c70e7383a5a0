//! HTTP 103 Early Hints middleware.
//!
//! Generated `Link` headers are cached per normalized URL. On a cache hit the
//! headers are replayed as a 103 before the handler runs and attached again
//! to the final response; on a miss the final response is scanned (during
//! the request, or once its body has been sent) so the next request can hit.

pub mod attach;
pub mod body;
pub mod eligibility;
pub mod error;
pub mod informational;
pub mod layer;
pub mod middleware;
pub mod transport;

pub use attach::{attach_link_header, attach_to_headers};
pub use eligibility::{Eligibility, RequestFormat, SkipReason, normalized_url};
pub use error::HintsError;
pub use informational::{CommitState, InformationalHandle, InformationalSender, Preliminary, early_hints_status};
pub use layer::early_hints;
pub use middleware::{DeferredHints, EarlyHints, EarlyHintsBuilder};
pub use transport::{ConnectionSender, serve, serve_connection};
