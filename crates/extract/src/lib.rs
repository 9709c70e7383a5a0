//! HTML-derived link candidates for early-hints.
//!
//! This crate turns a rendered HTML page into preload directives:
//!
//! ### Candidate Extraction
//! - Selects `<link>`, blocking `<script src>`, eager `<img src>` outside
//!   `<picture>`, and `<object data>` elements.
//! - Derives the relation (`preload`, `preconnect`, `modulepreload`) and the
//!   `as` destination from the element and the URL's extension.
//!
//! ### Filtering
//! - Relative URLs are rewritten against the configured base path.
//! - URLs matching an exclude keyword are dropped.
//!
//! ### Fetching
//! - [`PageFetcher`] downloads a page so the pipeline can be run offline.

pub mod body;
pub mod candidates;
pub mod classify;
pub mod fetch;
pub mod filter;
pub mod urls;

pub use body::BodyLinks;
pub use candidates::{CandidateExtractor, LinkableNode, linkable_nodes};
pub use classify::{Destination, Relation};
pub use fetch::{FetchConfig, FetchedPage, PageFetcher};
pub use filter::ExcludeFilter;
pub use urls::BasePath;
