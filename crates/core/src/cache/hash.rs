//! Cache key generation.

use sha2::{Digest, Sha256};

/// Prefix shared by every early-hints cache key.
pub const KEY_PREFIX: &str = "earlyhints-";

/// Compute the cache key for a normalized request URL.
pub fn compute_cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{KEY_PREFIX}{}", hex::encode(hasher.finalize()))
}
