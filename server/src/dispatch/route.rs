//! Route webhook: the per-route state machine covering owner controls
//! (replies, block/unblock) and the visitor path (welcome, verification
//! gate, relay).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{internal_error, secret_header_matches, texts, ACK};
use crate::blocklist;
use crate::correlate;
use crate::counters;
use crate::fraud;
use crate::registry::{self, Route};
use crate::state::AppState;
use crate::store::keys;
use crate::telegram::{self, CallbackQuery, Message, MessageOptions, Update, User};
use crate::verify::gate;

/// POST /entry/{route_id} — webhook for a hosted route's bot.
pub async fn webhook(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<&'static str, (StatusCode, String)> {
    let Some(route) = registry::lookup(state.store.as_ref(), &route_id)
        .await
        .map_err(internal_error)?
    else {
        return Err((StatusCode::NOT_FOUND, "Bot not found".to_string()));
    };

    // The secret registered alongside the webhook must come back on every
    // delivery; anything else is not Telegram.
    if !secret_header_matches(&headers, &route.secret) {
        return Err((StatusCode::UNAUTHORIZED, "Bad webhook secret".to_string()));
    }

    if let Some(cq) = update.callback_query {
        handle_callback(&state, &route, cq).await?;
        return Ok(ACK);
    }

    let Some(msg) = update.message else {
        return Ok(ACK);
    };

    if msg.chat.id == route.owner_id {
        handle_owner_message(&state, &route, msg).await?;
    } else {
        handle_visitor_message(&state, &route, &route_id, msg).await?;
    }
    Ok(ACK)
}

/// Block/unblock buttons under relayed messages. Only the owner's presses
/// have effect; anyone else gets an alert and nothing changes.
async fn handle_callback(
    state: &AppState,
    route: &Route,
    cq: CallbackQuery,
) -> Result<(), (StatusCode, String)> {
    let token = &route.token;
    let chat_id = cq.message.as_ref().map(|m| m.chat.id);

    if chat_id != Some(route.owner_id) {
        if let Err(e) = state
            .telegram
            .answer_callback_query(token, &cq.id, Some("Not allowed"), true)
            .await
        {
            tracing::debug!("Callback ack failed: {}", e);
        }
        return Ok(());
    }

    let data = cq.data.as_deref().unwrap_or("");
    let store = state.store.as_ref();

    let (ack_text, show_alert) = if let Some(target) = parse_target(data, texts::CB_BLOCK_PREFIX) {
        blocklist::set_blocked(store, target, true)
            .await
            .map_err(internal_error)?;
        (Some(texts::blocked_ack(&target.to_string())), true)
    } else if let Some(target) = parse_target(data, texts::CB_UNBLOCK_PREFIX) {
        blocklist::set_blocked(store, target, false)
            .await
            .map_err(internal_error)?;
        (Some(texts::unblocked_ack(&target.to_string())), true)
    } else {
        // reply_placeholder and anything unknown: plain ack
        (None, false)
    };

    if let Err(e) = state
        .telegram
        .answer_callback_query(token, &cq.id, ack_text.as_deref(), show_alert)
        .await
    {
        tracing::debug!("Callback ack failed: {}", e);
    }
    Ok(())
}

fn parse_target(data: &str, prefix: &str) -> Option<i64> {
    data.strip_prefix(prefix)?.parse().ok()
}

async fn handle_owner_message(
    state: &AppState,
    route: &Route,
    msg: Message,
) -> Result<(), (StatusCode, String)> {
    let token = &route.token;
    let store = state.store.as_ref();
    let text = msg.text_or_empty().to_string();

    if let Some(replied_to) = &msg.reply_to_message {
        let visitor_id = correlate::resolve(store, replied_to.message_id)
            .await
            .map_err(internal_error)?;

        // Expired or foreign reply target: drop silently. The owner replying
        // to their own notes must not leak anywhere.
        if let Some(visitor_id) = visitor_id {
            if text.starts_with("/block") {
                blocklist::set_blocked(store, visitor_id, true)
                    .await
                    .map_err(internal_error)?;
                let ack = texts::blocked_ack(&visitor_id.to_string());
                send(state, token, route.owner_id, &ack).await;
                return Ok(());
            }
            if text.starts_with("/unblock") {
                blocklist::set_blocked(store, visitor_id, false)
                    .await
                    .map_err(internal_error)?;
                let ack = texts::unblocked_ack(&visitor_id.to_string());
                send(state, token, route.owner_id, &ack).await;
                return Ok(());
            }

            if let Err(e) = state
                .telegram
                .copy_message(token, visitor_id, msg.chat.id, msg.message_id, None)
                .await
            {
                tracing::warn!("Reply relay to {} failed: {}", visitor_id, e);
            }
            return Ok(());
        }
    }

    if text == "/start" {
        send(state, token, route.owner_id, texts::OWNER_HELP).await;
        // Re-install the command menu so routes created before the menu
        // existed pick it up too.
        let telegram = Arc::clone(&state.telegram);
        let token = token.clone();
        tokio::spawn(async move {
            if let Err(e) = telegram
                .set_my_commands(&token, &telegram::default_commands())
                .await
            {
                tracing::debug!("setMyCommands failed: {}", e);
            }
        });
    }
    Ok(())
}

async fn handle_visitor_message(
    state: &AppState,
    route: &Route,
    route_id: &str,
    msg: Message,
) -> Result<(), (StatusCode, String)> {
    let token = &route.token;
    let store = state.store.as_ref();
    let visitor_id = msg.chat.id;
    let text = msg.text_or_empty().to_string();

    if blocklist::is_blocked(store, visitor_id)
        .await
        .map_err(internal_error)?
    {
        send(state, token, visitor_id, texts::BLOCKED_NOTICE).await;
        return Ok(());
    }

    if text == "/start" {
        counters::spawn_increment(Arc::clone(&state.store), keys::route_users(route_id));
        let welcome = route.welcome_msg.as_deref().unwrap_or(texts::VISITOR_WELCOME);
        send(state, token, visitor_id, welcome).await;
        return Ok(());
    }

    if route.enable_verify
        && !gate::is_verified(store, route_id, visitor_id)
            .await
            .map_err(internal_error)?
    {
        send_challenge(state, route, route_id, visitor_id, msg.from.as_ref()).await;
        return Ok(());
    }

    relay_to_owner(state, route, route_id, msg).await
}

async fn send_challenge(
    state: &AppState,
    route: &Route,
    route_id: &str,
    visitor_id: i64,
    visitor: Option<&User>,
) {
    let first_name = visitor
        .map(|u| u.first_name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("User");
    let username = visitor
        .and_then(|u| u.username.as_deref())
        .map(|u| format!("(@{})", u))
        .unwrap_or_default();

    let base = state.config.public_url.trim_end_matches('/');
    let url = reqwest::Url::parse_with_params(
        &format!("{}/verify", base),
        &[
            ("uid", visitor_id.to_string().as_str()),
            ("routeId", route_id),
            ("name", first_name),
            ("user", &username),
        ],
    );
    let url = match url {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Challenge URL construction failed: {}", e);
            return;
        }
    };

    if let Err(e) = state
        .telegram
        .send_message(
            &route.token,
            visitor_id,
            texts::VERIFY_PROMPT,
            MessageOptions::markdown().with_markup(texts::verify_keyboard(url.as_str())),
        )
        .await
    {
        tracing::warn!("Challenge prompt to {} failed: {}", visitor_id, e);
    }
}

/// Copy the visitor's message to the owner with inline controls, then record
/// the correlation and kick off the detached bookkeeping.
async fn relay_to_owner(
    state: &AppState,
    route: &Route,
    route_id: &str,
    msg: Message,
) -> Result<(), (StatusCode, String)> {
    let visitor_id = msg.chat.id;
    let visitor = msg.from.clone().unwrap_or(User {
        id: visitor_id,
        first_name: String::new(),
        last_name: None,
        username: None,
    });

    let relayed = match state
        .telegram
        .copy_message(
            &route.token,
            route.owner_id,
            visitor_id,
            msg.message_id,
            Some(texts::relay_controls(&visitor)),
        )
        .await
    {
        Ok(relayed) => relayed,
        Err(e) => {
            // No correlation, no counters: nothing reached the owner.
            tracing::warn!("Relay to owner {} failed: {}", route.owner_id, e);
            return Ok(());
        }
    };

    // The owner can only reply if this mapping lands; treat a store failure
    // here as a real error so the upstream retries the delivery.
    correlate::record(state.store.as_ref(), relayed.message_id, visitor_id)
        .await
        .map_err(internal_error)?;

    counters::spawn_increment(Arc::clone(&state.store), keys::route_msgs(route_id));

    let telegram = Arc::clone(&state.telegram);
    let http = state.http.clone();
    let fraud_db_url = state.config.fraud_db_url.clone();
    let token = route.token.clone();
    let owner_id = route.owner_id;
    tokio::spawn(async move {
        if fraud::is_suspicious(&http, &fraud_db_url, visitor_id).await {
            if let Err(e) = telegram
                .send_message(
                    &token,
                    owner_id,
                    &texts::fraud_alert(visitor_id),
                    MessageOptions::markdown(),
                )
                .await
            {
                tracing::debug!("Fraud alert to owner failed: {}", e);
            }
        }
    });

    Ok(())
}

/// Markdown send with failures logged, not propagated.
async fn send(state: &AppState, token: &str, chat_id: i64, text: &str) {
    if let Err(e) = state
        .telegram
        .send_message(token, chat_id, text, MessageOptions::markdown())
        .await
    {
        tracing::warn!("sendMessage to {} failed: {}", chat_id, e);
    }
}
