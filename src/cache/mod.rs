//! Local TTL cache for resolved settings.
//!
//! Entries are evicted lazily: an expired entry stays in the map until it is
//! overwritten or the whole cache is cleared, but is never returned.


use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Concurrent key -> value map with per-entry expiry
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value if present and not yet expired
    pub fn get(
        &self,
        key: &str,
    ) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone())
    }

    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Duration,
    ) {
        let entry = CacheEntry {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Drops every entry, live or expired
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        trace!(dropped = entries.len(), "cache cleared");
        entries.clear();
    }

    /// Number of entries held, including expired ones not yet overwritten
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
