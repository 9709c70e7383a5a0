//! Store contract and the cache adapter the middleware talks to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::compute_cache_key;
use super::{CacheDb, MemoryStore};
use crate::Error;
use crate::config::{CacheDriver, HintsConfig};
use crate::links::LinkSet;

/// Key-value store with per-entry TTL.
///
/// A missing or expired key is `Ok(None)`. Concurrent writers for the same
/// key may race; the last write wins.
#[async_trait]
pub trait HintStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error>;

    async fn forget(&self, key: &str) -> Result<bool, Error>;

    /// Remove expired entries, returning how many were deleted.
    async fn purge_expired(&self) -> Result<u64, Error> {
        Ok(0)
    }

    /// Driver name used in logs.
    fn driver(&self) -> &'static str;
}

/// Store that never keeps anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

#[async_trait]
impl HintStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), Error> {
        Ok(())
    }

    async fn forget(&self, _key: &str) -> Result<bool, Error> {
        Ok(false)
    }

    fn driver(&self) -> &'static str {
        "null"
    }
}

/// Open the store selected by `config.cache_driver`.
pub async fn open_store(config: &HintsConfig) -> Result<Arc<dyn HintStore>, Error> {
    let store: Arc<dyn HintStore> = match config.cache_driver {
        CacheDriver::Memory => Arc::new(MemoryStore::new()),
        CacheDriver::Sqlite => Arc::new(CacheDb::open(&config.cache_path).await?),
        CacheDriver::Null => Arc::new(NullStore),
    };

    tracing::debug!(driver = store.driver(), "opened early hints store");
    Ok(store)
}

/// A cached, already budgeted link set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub url: String,
    pub links: LinkSet,
    pub stored_at: DateTime<Utc>,
}

impl CacheRecord {
    /// The header value to replay.
    pub fn header(&self) -> String {
        self.links.to_header_value()
    }
}

/// Cache of generated link sets keyed by normalized request URL.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn HintStore>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn HintStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn driver(&self) -> &'static str {
        self.store.driver()
    }

    /// Look up the record for `url`.
    ///
    /// Store failures and undecodable records are logged and reported as a miss.
    pub async fn lookup(&self, url: &str) -> Option<CacheRecord> {
        let key = compute_cache_key(url);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(url, driver = self.store.driver(), error = %e, "early hints lookup failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(url, error = %e, "discarding malformed early hints record");
                None
            }
        }
    }

    /// Store `links` for `url`. Failures are logged and dropped.
    pub async fn store(&self, url: &str, links: &LinkSet) {
        let record = CacheRecord { url: url.to_string(), links: links.clone(), stored_at: Utc::now() };
        let result = match serde_json::to_string(&record) {
            Ok(value) => self.store.put(&compute_cache_key(url), &value, self.ttl).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => tracing::debug!(url, links = links.len(), "stored early hints"),
            Err(e) => tracing::warn!(url, driver = self.store.driver(), error = %e, "failed to store early hints"),
        }
    }

    /// Drop the record for `url`, if any.
    pub async fn forget(&self, url: &str) -> Result<bool, Error> {
        self.store.forget(&compute_cache_key(url)).await
    }

    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.store.purge_expired().await
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("driver", &self.store.driver())
            .field("ttl", &self.ttl)
            .finish()
    }
}
