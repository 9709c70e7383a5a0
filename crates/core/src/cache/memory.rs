//! In-process store with lazy expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::HintStore;
use crate::Error;

struct CachedValue {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CachedValue {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory store for generated headers.
///
/// Uses a simple HashMap with tokio RwLock for concurrent access. Expired
/// entries are evicted when read and in bulk by `purge_expired`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, CachedValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl HintStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(cached) if !cached.is_expired() => return Ok(Some(cached.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(CachedValue::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Error> {
        let cached = CachedValue { value: value.to_string(), expires_at: Instant::now().checked_add(ttl) };
        self.entries.write().await.insert(key.to_string(), cached);
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, cached| !cached.is_expired());
        Ok((before - entries.len()) as u64)
    }

    fn driver(&self) -> &'static str {
        "memory"
    }
}
