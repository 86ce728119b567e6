//! Key naming for every entity in the store.
//!
//! The names are load-bearing: existing deployments have live data under
//! them, so they must stay stable across upgrades.

/// Singleton platform settings (new-route acceptance, default verify TTL).
pub const PLATFORM_SETTINGS: &str = "platform:settings";

/// Platform-wide count of registered routes.
pub const TOTAL_ROUTES: &str = "stats:platform:total_bots";

/// Route record, looked up on every inbound event for that route.
pub fn route(route_id: &str) -> String {
    format!("platform:route:{}", route_id)
}

/// Owner → route index, written alongside the route record at registration.
pub fn owner_index(owner_id: i64) -> String {
    format!("platform:user:{}", owner_id)
}

/// Per-(route, visitor) verification record. The route id in the key is what
/// isolates one route's verification state from every other route's.
pub fn verified(route_id: &str, visitor_id: i64) -> String {
    format!("verified-{}-{}", route_id, visitor_id)
}

/// Legacy un-scoped verification record. Written only when a verification
/// request arrives without a route id, which should not happen in practice.
pub fn verified_legacy(visitor_id: i64) -> String {
    format!("verified-{}", visitor_id)
}

/// Per-visitor block flag. Deliberately has no route component: a block
/// applies platform-wide (see blocklist module docs).
pub fn blocked(visitor_id: i64) -> String {
    format!("isblocked-{}", visitor_id)
}

/// Relayed-message → originating-visitor correlation entry.
pub fn correlation(relayed_message_id: i64) -> String {
    format!("msg-map-{}", relayed_message_id)
}

/// Per-route count of visitors who started a chat.
pub fn route_users(route_id: &str) -> String {
    format!("stats:{}:users", route_id)
}

/// Per-route count of relayed messages.
pub fn route_msgs(route_id: &str) -> String {
    format!("stats:{}:msgs", route_id)
}
