//! Best-effort usage counters: read current value, write current + 1. The
//! store has no compare-and-swap, so concurrent increments can lose updates.
//! These are advisory statistics, not quota enforcement; approximate is
//! fine, and that is documented behavior, not a bug to fix.

use std::sync::Arc;

use crate::store::{StateStore, StoreError};

/// Read a counter; absent reads as 0.
pub async fn read(store: &dyn StateStore, key: &str) -> Result<i64, StoreError> {
    Ok(store
        .get(key)
        .await?
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(0))
}

/// Increment a counter via read-then-write.
pub async fn increment(store: &dyn StateStore, key: &str) -> Result<(), StoreError> {
    let current = read(store, key).await?;
    store.put(key, &(current + 1).to_string(), None).await
}

/// Increment on a detached task. Failures are logged and swallowed; counter
/// updates must never delay or fail the caller's response path.
pub fn spawn_increment(store: Arc<dyn StateStore>, key: String) {
    tokio::spawn(async move {
        if let Err(e) = increment(store.as_ref(), &key).await {
            tracing::debug!("Counter increment failed for {}: {}", key, e);
        }
    });
}
