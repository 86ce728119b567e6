//! Correlation table: maps a relayed message's id in the owner's chat back to
//! the originating visitor, so the owner can reply by replying. Entries live
//! for a fixed 48-hour window via store-level TTL; a reply to an expired (or
//! unrelated) message resolves to absent, which callers treat as a silent
//! drop, not an error.

use std::time::Duration;

use crate::store::{self, keys, StateStore, StoreError};

/// How long an owner can reply to a relayed message.
pub const CORRELATION_TTL: Duration = Duration::from_secs(48 * 60 * 60);

/// Record the mapping at relay time. Relayed-message ids are unique per
/// relay, so no overwrite protection is needed.
pub async fn record(
    store: &dyn StateStore,
    relayed_message_id: i64,
    visitor_id: i64,
) -> Result<(), StoreError> {
    store::put_json(
        store,
        &keys::correlation(relayed_message_id),
        &visitor_id,
        Some(CORRELATION_TTL),
    )
    .await
}

/// Resolve a replied-to message id to its originating visitor.
pub async fn resolve(
    store: &dyn StateStore,
    relayed_message_id: i64,
) -> Result<Option<i64>, StoreError> {
    store::get_json(store, &keys::correlation(relayed_message_id)).await
}
