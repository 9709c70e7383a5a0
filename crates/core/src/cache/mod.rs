//! Result cache for generated link headers.
//!
//! Generated [`LinkSet`](crate::LinkSet)s are stored per normalized request URL
//! so the next request for the same page can be answered with hints before its
//! handler runs. The middleware only relies on get/put-with-TTL semantics:
//!
//! - [`MemoryStore`]: in-process map with lazy expiry
//! - [`CacheDb`]: SQLite backend with WAL mode and schema migrations
//! - [`NullStore`]: stores nothing
//!
//! Store failures are never fatal; [`ResultCache`] turns them into misses.

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod records;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::compute_cache_key;
pub use memory::MemoryStore;
pub use store::{CacheRecord, HintStore, NullStore, ResultCache, open_store};
