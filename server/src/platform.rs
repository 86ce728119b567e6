//! Global platform settings: whether new routes are accepted and the default
//! verification TTL. A single JSON object under one key, mutated only by the
//! platform admin via read-modify-write. Concurrent edits are last-write-wins,
//! which is acceptable for a single-operator admin surface.

use serde::{Deserialize, Serialize};

use crate::store::{self, keys, StateStore, StoreError};

/// Verification TTL used when no platform setting exists (30 days).
pub const FALLBACK_VERIFY_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Whether new route registrations are accepted from non-admins.
    pub enable_new_users: bool,
    /// Default verification TTL in seconds, applied at mark-verified time.
    pub verify_ttl: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enable_new_users: true,
            verify_ttl: FALLBACK_VERIFY_TTL_SECS,
        }
    }
}

/// Load the settings singleton; defaults when never written.
pub async fn load(store: &dyn StateStore) -> Result<PlatformConfig, StoreError> {
    Ok(store::get_json(store, keys::PLATFORM_SETTINGS)
        .await?
        .unwrap_or_default())
}

/// Write the settings back whole. Callers must have loaded first; there are
/// no partial-field updates.
pub async fn save(store: &dyn StateStore, config: &PlatformConfig) -> Result<(), StoreError> {
    store::put_json(store, keys::PLATFORM_SETTINGS, config, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_load_defaults_when_absent() {
        let store = MemoryStore::new();
        let config = load(&store).await.unwrap();
        assert!(config.enable_new_users);
        assert_eq!(config.verify_ttl, FALLBACK_VERIFY_TTL_SECS);
    }

    #[tokio::test]
    async fn test_read_modify_write_roundtrip() {
        let store = MemoryStore::new();
        let mut config = load(&store).await.unwrap();
        config.enable_new_users = false;
        config.verify_ttl = 7 * 24 * 60 * 60;
        save(&store, &config).await.unwrap();

        let reloaded = load(&store).await.unwrap();
        assert!(!reloaded.enable_new_users);
        assert_eq!(reloaded.verify_ttl, 7 * 24 * 60 * 60);
    }
}
