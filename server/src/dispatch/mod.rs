//! Webhook dispatchers: stateless per-event state machines for the platform
//! bot and for every hosted route's bot. All durable state lives in the
//! store; each invocation reads what it needs and writes at most a few keys.

pub mod platform;
pub mod route;
pub mod texts;

use axum::http::{HeaderMap, StatusCode};

/// Header Telegram echoes the webhook secret back in.
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Webhook body we acknowledge with; the upstream only looks at the status.
pub const ACK: &str = "Ok";

pub(crate) fn secret_header_matches(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|got| got == expected)
        .unwrap_or(false)
}

pub(crate) fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
