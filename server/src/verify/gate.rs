//! Verification gate: per-(route, visitor) presence records with store-level
//! expiry. Absence, whether the record was never written or the store
//! evicted it, reads as unverified; there is no explicit transition back.
//!
//! Isolation across routes is structural: the record key always embeds the
//! route id, so verifying a visitor on one route can never satisfy a check
//! on another.

use std::time::Duration;

use crate::platform::{self, FALLBACK_VERIFY_TTL_SECS};
use crate::store::{keys, StateStore, StoreError};

/// Presence check for `(route, visitor)`. Absent (including post-expiry)
/// is unverified.
pub async fn is_verified(
    store: &dyn StateStore,
    route_id: &str,
    visitor_id: i64,
) -> Result<bool, StoreError> {
    Ok(store
        .get(&keys::verified(route_id, visitor_id))
        .await?
        .is_some())
}

/// Write a verification record with the given TTL.
///
/// A missing route id falls back to the legacy un-scoped key. That path
/// exists only for malformed challenge submissions and should not occur in
/// normal operation; the scoped key is the real one.
pub async fn mark_verified(
    store: &dyn StateStore,
    route_id: Option<&str>,
    visitor_id: i64,
    ttl_secs: u64,
) -> Result<(), StoreError> {
    let key = match route_id {
        Some(route_id) => keys::verified(route_id, visitor_id),
        None => keys::verified_legacy(visitor_id),
    };
    store
        .put(&key, "true", Some(Duration::from_secs(ttl_secs)))
        .await
}

/// TTL to apply at mark-verified time: the platform's current default, or
/// the hardcoded 30-day fallback when settings were never written.
pub async fn effective_ttl(store: &dyn StateStore) -> Result<u64, StoreError> {
    let config = platform::load(store).await?;
    if config.verify_ttl > 0 {
        Ok(config.verify_ttl)
    } else {
        Ok(FALLBACK_VERIFY_TTL_SECS)
    }
}
