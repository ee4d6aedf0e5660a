//! In-memory key/value cache with per-entry time-to-live

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Content-agnostic TTL cache.
///
/// Expired entries are evicted lazily when read; there is no background
/// sweep, no size bound and no LRU. The cache carries no lock of its own:
/// the aggregator owns it behind a mutex and serializes all access.
pub struct TtlCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    default_ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    /// Creates a cache whose `insert` uses the given default TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    /// Returns the live value for `key`, or `None` if it is absent or
    /// expired. An expired entry is removed as a side effect.
    pub fn get(&mut self, key: &str) -> Option<T> {
        match self.entries.get(key) {
            Some(entry) if Instant::now() > entry.expires_at => {
                self.entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores `value` under `key` with the default TTL, replacing any
    /// existing entry unconditionally.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Stores `value` under `key` with an explicit TTL
    pub fn insert_with_ttl(&mut self, key: impl Into<String>, value: T, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Removes the entry for `key`, if any
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
