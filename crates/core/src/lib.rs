//! Core types and shared functionality for early-hints.
//!
//! This crate provides:
//! - The link directive model, `Link` header parsing and serialization
//! - The byte budget applied to generated headers
//! - Contribution hooks and the default-headers contributor
//! - Result cache stores (memory, SQLite, null)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod contribute;
pub mod error;
pub mod links;

pub use cache::{CacheDb, CacheRecord, HintStore, MemoryStore, NullStore, ResultCache, open_store};
pub use config::{CacheDriver, ConfigError, HintsConfig};
pub use contribute::{Contributor, Contributors, DefaultHeaders, ResponseView};
pub use error::Error;
pub use links::{AttrValue, LinkEntry, LinkSet, budget};
