//! In-memory store backend: a `DashMap` of entries carrying an optional
//! expiry instant, evicted lazily on read. Suitable for single-process
//! deployments and tests; the trait seam keeps an external KV backend
//! swappable without touching callers.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{StateStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// DashMap-backed `StateStore` with lazy TTL eviction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    /// Seconds added to the wall clock. Test affordance for TTL expiry;
    /// stays 0 in production.
    clock_skew_secs: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift this store's notion of "now" forward. Lets tests observe
    /// store-level expiry without sleeping through real TTLs.
    pub fn advance(&self, by: Duration) {
        self.clock_skew_secs
            .fetch_add(by.as_secs() as i64, Ordering::SeqCst);
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(self.clock_skew_secs.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.now();

        // Lazy eviction: an expired entry is removed on first read after its
        // deadline and reported as absent, same as a never-written key.
        if let Some(entry) = self.entries.get(key) {
            if let Some(expires_at) = entry.expires_at {
                if expires_at <= now {
                    drop(entry);
                    self.entries.remove(key);
                    return Ok(None);
                }
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|d| self.now() + chrono::Duration::seconds(d.as_secs() as i64));
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}
