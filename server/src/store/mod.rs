//! State store adapter: uniform get/put access to a key-value store with
//! optional per-key expiry. No transactions, no multi-key atomicity, no
//! compare-and-swap: callers must tolerate read-modify-write races.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod keys;
pub mod memory;

pub use memory::MemoryStore;

/// Error from state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Async key-value access with optional per-key TTL.
///
/// Absence is the single "not present" signal: an expired key reads exactly
/// like one that never existed. Implementations must not expose a separate
/// "expired" state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a key. Expired or never-written keys return `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a key. `ttl = None` means the key never expires.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;
}

/// Read a key and deserialize its value as JSON.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize a value as JSON and write it under a key.
pub async fn put_json<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.put(key, &raw, ttl).await
}
