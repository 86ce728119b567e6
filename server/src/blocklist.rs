//! Per-visitor block flag.
//!
//! The key is deliberately visitor-scoped with no route component
//! (`isblocked-{uid}`), so a block performed by one route's owner applies
//! platform-wide to every route that sees the same visitor id. Verification
//! state, by contrast, is route-scoped. This asymmetry is inherited from the
//! original deployment and preserved for key compatibility; scoping blocks
//! per route would be a behavior change requiring confirmation. "Only this
//! route's owner may flip the flag" is enforced by the dispatcher's sender
//! identity check, not here.

use crate::store::{self, keys, StateStore, StoreError};

/// Flip a visitor's block flag. Unblocking writes `false` rather than
/// deleting, matching the original key lifecycle.
pub async fn set_blocked(
    store: &dyn StateStore,
    visitor_id: i64,
    blocked: bool,
) -> Result<(), StoreError> {
    store::put_json(store, &keys::blocked(visitor_id), &blocked, None).await
}

/// Absent reads as not blocked.
pub async fn is_blocked(store: &dyn StateStore, visitor_id: i64) -> Result<bool, StoreError> {
    Ok(store::get_json(store, &keys::blocked(visitor_id))
        .await?
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_absent_means_not_blocked() {
        let store = MemoryStore::new();
        assert!(!is_blocked(&store, 555).await.unwrap());
    }

    #[tokio::test]
    async fn test_block_unblock_cycle() {
        let store = MemoryStore::new();
        set_blocked(&store, 555, true).await.unwrap();
        assert!(is_blocked(&store, 555).await.unwrap());

        set_blocked(&store, 555, false).await.unwrap();
        assert!(!is_blocked(&store, 555).await.unwrap());
    }

    #[tokio::test]
    async fn test_block_is_per_visitor() {
        let store = MemoryStore::new();
        set_blocked(&store, 555, true).await.unwrap();
        assert!(!is_blocked(&store, 556).await.unwrap());
    }
}
