//! Route registry: creation and lookup of routes. A route binds one owner to
//! one upstream bot credential and carries the webhook secret the upstream
//! echoes back on every delivery for that route.
//!
//! Registration is a multi-step protocol over a store with no cross-key
//! transactions: probe the credential, register the webhook upstream, then
//! persist locally. A failure after the upstream webhook registration but
//! before persistence leaves an orphaned upstream webhook with no local
//! record. Known limitation of the storage model; there is no reconciliation
//! sweep.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::counters;
use crate::store::{self, keys, StateStore, StoreError};
use crate::telegram::{self, TelegramClient, TelegramError};

/// A routing identity: one owner, one upstream bot credential.
/// Immutable after creation except `enable_verify` / `welcome_msg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Upstream bot credential this route relays through.
    pub token: String,
    pub owner_id: i64,
    /// Pre-shared webhook secret for this route's entry point.
    pub secret: String,
    pub bot_username: String,
    /// Unix millis.
    pub created_at: i64,
    /// Whether first contact is gated by human verification.
    #[serde(default = "default_true")]
    pub enable_verify: bool,
    /// Owner-customized welcome text shown on a visitor's /start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_msg: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Owner → route index entry: the route record plus its id, so an owner's
/// route can be found without knowing the route id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerIndexEntry {
    #[serde(flatten)]
    pub route: Route,
    #[serde(rename = "routeId")]
    pub route_id: String,
}

/// Outcome of a successful registration.
#[derive(Debug)]
pub struct RegisteredRoute {
    pub route_id: String,
    pub bot_username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// The upstream rejected the candidate credential.
    #[error("Invalid credential")]
    InvalidCredential,

    /// Credential was valid but the upstream webhook registration failed;
    /// nothing was persisted locally.
    #[error("Webhook registration failed: {0}")]
    RegistrationFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport-level failure talking to the upstream.
    #[error(transparent)]
    Upstream(TelegramError),
}

/// Quick shape check for an upstream bot credential:
/// `{digits}:{35+ chars of [A-Za-z0-9_-]}`. Used by the dispatcher to decide
/// whether an inbound text is a registration request.
pub fn looks_like_bot_credential(text: &str) -> bool {
    let text = text.trim();
    let Some((id_part, secret_part)) = text.split_once(':') else {
        return false;
    };
    !id_part.is_empty()
        && id_part.bytes().all(|b| b.is_ascii_digit())
        && secret_part.len() >= 35
        && secret_part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Register a new route for `owner_id` from a candidate bot credential.
///
/// Order matters: nothing is written locally until the upstream has both
/// accepted the credential (getMe) and taken the webhook registration.
pub async fn register(
    store: &Arc<dyn StateStore>,
    telegram: &TelegramClient,
    candidate_token: &str,
    owner_id: i64,
    public_url: &str,
) -> Result<RegisteredRoute, RegisterError> {
    // 1. Capability probe: does the credential actually belong to a bot?
    let identity = match telegram.get_me(candidate_token).await {
        Ok(identity) => identity,
        Err(TelegramError::Api(_)) | Err(TelegramError::MissingResult) => {
            return Err(RegisterError::InvalidCredential);
        }
        Err(e) => return Err(RegisterError::Upstream(e)),
    };
    let bot_username = identity.username.unwrap_or_default();

    // 2. Point the upstream at this route's entry point, with a fresh secret
    // it will echo back on every delivery.
    let route_id = Uuid::new_v4().to_string();
    let secret = Uuid::new_v4().to_string();
    let webhook_url = format!("{}/entry/{}", public_url.trim_end_matches('/'), route_id);

    match telegram
        .set_webhook(
            candidate_token,
            &webhook_url,
            &secret,
            &["message", "callback_query"],
        )
        .await
    {
        Ok(_) => {}
        Err(TelegramError::Api(description)) => {
            return Err(RegisterError::RegistrationFailed(description));
        }
        Err(e) => return Err(RegisterError::Upstream(e)),
    }

    // Install the command menu; best-effort, a failure here is cosmetic.
    if let Err(e) = telegram
        .set_my_commands(candidate_token, &telegram::default_commands())
        .await
    {
        tracing::debug!("setMyCommands failed for new route {}: {}", route_id, e);
    }

    // 3. Persist the route record and the owner index.
    let route = Route {
        token: candidate_token.to_string(),
        owner_id,
        secret,
        bot_username: bot_username.clone(),
        created_at: Utc::now().timestamp_millis(),
        enable_verify: true,
        welcome_msg: None,
    };
    store::put_json(store.as_ref(), &keys::route(&route_id), &route, None).await?;
    store::put_json(
        store.as_ref(),
        &keys::owner_index(owner_id),
        &OwnerIndexEntry {
            route: route.clone(),
            route_id: route_id.clone(),
        },
        None,
    )
    .await?;

    counters::spawn_increment(Arc::clone(store), keys::TOTAL_ROUTES.to_string());

    tracing::info!(
        "Route {} registered for owner {} (@{})",
        route_id,
        owner_id,
        bot_username
    );

    Ok(RegisteredRoute {
        route_id,
        bot_username,
    })
}

/// Look up a route by id.
pub async fn lookup(store: &dyn StateStore, route_id: &str) -> Result<Option<Route>, StoreError> {
    store::get_json(store, &keys::route(route_id)).await
}
