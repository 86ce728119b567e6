//! Platform bot webhook: admin dashboard callbacks, the platform welcome,
//! and new-route registration from a pasted bot credential.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{internal_error, secret_header_matches, texts, ACK};
use crate::counters;
use crate::platform;
use crate::registry::{self, RegisterError};
use crate::state::AppState;
use crate::store::keys;
use crate::telegram::{CallbackQuery, Message, MessageOptions, Update};

/// POST /endpoint — webhook for the platform's own bot.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<&'static str, (StatusCode, String)> {
    if !secret_header_matches(&headers, &state.config.bot_secret) {
        return Err((StatusCode::FORBIDDEN, "Unauthorized".to_string()));
    }

    if let Some(cq) = update.callback_query {
        handle_admin_callback(&state, cq).await?;
        return Ok(ACK);
    }

    let Some(msg) = update.message else {
        return Ok(ACK);
    };
    handle_message(&state, msg).await?;
    Ok(ACK)
}

/// Dashboard button presses. Every admin action is a read-modify-write of
/// the settings singleton followed by an in-place dashboard re-render.
async fn handle_admin_callback(
    state: &AppState,
    cq: CallbackQuery,
) -> Result<(), (StatusCode, String)> {
    let token = &state.config.bot_token;
    let Some(dashboard_msg) = cq.message else {
        return Ok(());
    };
    let chat_id = dashboard_msg.chat.id;

    if chat_id != state.config.admin_id {
        if let Err(e) = state
            .telegram
            .answer_callback_query(token, &cq.id, Some("Not allowed"), true)
            .await
        {
            tracing::debug!("Callback ack failed: {}", e);
        }
        return Ok(());
    }

    let store = state.store.as_ref();
    let mut config = platform::load(store).await.map_err(internal_error)?;
    let data = cq.data.as_deref().unwrap_or("");

    let ack_text = if data == texts::CB_ADMIN_TOGGLE_ACCESS {
        config.enable_new_users = !config.enable_new_users;
        platform::save(store, &config).await.map_err(internal_error)?;
        render_dashboard(state, chat_id, dashboard_msg.message_id, &config).await;
        Some(if config.enable_new_users {
            "Registrations opened"
        } else {
            "Registrations closed"
        })
    } else if data == texts::CB_ADMIN_TTL_MENU {
        let (text, markup) = texts::ttl_menu(config.verify_ttl);
        edit_in_place(state, chat_id, dashboard_msg.message_id, &text, markup).await;
        None
    } else if let Some(days) = data
        .strip_prefix(texts::CB_ADMIN_SET_TTL_PREFIX)
        .and_then(|d| d.parse::<u64>().ok())
    {
        config.verify_ttl = days * 24 * 60 * 60;
        platform::save(store, &config).await.map_err(internal_error)?;
        render_dashboard(state, chat_id, dashboard_msg.message_id, &config).await;
        Some("Setting updated")
    } else if data == texts::CB_ADMIN_REFRESH {
        render_dashboard(state, chat_id, dashboard_msg.message_id, &config).await;
        Some("Refreshed")
    } else {
        None
    };

    if let Err(e) = state
        .telegram
        .answer_callback_query(token, &cq.id, ack_text, false)
        .await
    {
        tracing::debug!("Callback ack failed: {}", e);
    }
    Ok(())
}

async fn render_dashboard(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    config: &platform::PlatformConfig,
) {
    let total = counters::read(state.store.as_ref(), keys::TOTAL_ROUTES)
        .await
        .unwrap_or(0);
    let (text, markup) = texts::dashboard(config, total);
    edit_in_place(state, chat_id, message_id, &text, markup).await;
}

async fn edit_in_place(
    state: &AppState,
    chat_id: i64,
    message_id: i64,
    text: &str,
    markup: crate::telegram::InlineKeyboardMarkup,
) {
    if let Err(e) = state
        .telegram
        .edit_message_text(
            &state.config.bot_token,
            chat_id,
            message_id,
            text,
            MessageOptions::markdown().with_markup(markup),
        )
        .await
    {
        // Telegram rejects no-op edits of identical content; harmless.
        tracing::debug!("Dashboard edit failed: {}", e);
    }
}

async fn handle_message(state: &AppState, msg: Message) -> Result<(), (StatusCode, String)> {
    let token = &state.config.bot_token;
    let chat_id = msg.chat.id;
    let text = msg.text_or_empty().to_string();

    if text == "/start" {
        if chat_id == state.config.admin_id {
            let config = platform::load(state.store.as_ref())
                .await
                .map_err(internal_error)?;
            let total = counters::read(state.store.as_ref(), keys::TOTAL_ROUTES)
                .await
                .map_err(internal_error)?;
            let (dash_text, markup) = texts::dashboard(&config, total);
            send(state, token, chat_id, &dash_text, Some(markup)).await;
        } else {
            send(state, token, chat_id, texts::PLATFORM_WELCOME, None).await;
        }
        return Ok(());
    }

    if registry::looks_like_bot_credential(&text) {
        handle_registration(state, chat_id, text.trim()).await?;
    }

    // Anything else is ignored; the platform bot is not a chat partner.
    Ok(())
}

async fn handle_registration(
    state: &AppState,
    chat_id: i64,
    candidate_token: &str,
) -> Result<(), (StatusCode, String)> {
    let token = &state.config.bot_token;

    let config = platform::load(state.store.as_ref())
        .await
        .map_err(internal_error)?;
    if !config.enable_new_users && chat_id != state.config.admin_id {
        send(state, token, chat_id, texts::REGISTRATION_CLOSED, None).await;
        return Ok(());
    }

    send(state, token, chat_id, texts::REGISTRATION_IN_PROGRESS, None).await;

    let registered = match registry::register(
        &state.store,
        &state.telegram,
        candidate_token,
        chat_id,
        &state.config.public_url,
    )
    .await
    {
        Ok(registered) => registered,
        Err(RegisterError::InvalidCredential) => {
            send(state, token, chat_id, texts::REGISTRATION_INVALID_TOKEN, None).await;
            return Ok(());
        }
        Err(RegisterError::RegistrationFailed(description)) => {
            send(
                state,
                token,
                chat_id,
                &texts::registration_failed(&description),
                None,
            )
            .await;
            return Ok(());
        }
        Err(RegisterError::Upstream(e)) => {
            tracing::warn!("Registration upstream failure for owner {}: {}", chat_id, e);
            send(
                state,
                token,
                chat_id,
                &texts::registration_failed("upstream unreachable"),
                None,
            )
            .await;
            return Ok(());
        }
        Err(RegisterError::Store(e)) => return Err(internal_error(e)),
    };

    send(
        state,
        token,
        chat_id,
        &texts::registration_success(&registered.bot_username),
        None,
    )
    .await;

    // Courtesy: the owner's usage guide, sent through their brand-new bot.
    // Fails until the owner has opened a chat with it, which is fine.
    if let Err(e) = state
        .telegram
        .send_message(
            candidate_token,
            chat_id,
            texts::OWNER_HELP,
            MessageOptions::markdown(),
        )
        .await
    {
        tracing::debug!("First help message via new bot failed: {}", e);
    }

    Ok(())
}

/// Markdown send with failures logged, not propagated. User-facing progress
/// messages must never fail the webhook.
async fn send(
    state: &AppState,
    token: &str,
    chat_id: i64,
    text: &str,
    markup: Option<crate::telegram::InlineKeyboardMarkup>,
) {
    let mut options = MessageOptions::markdown();
    if let Some(markup) = markup {
        options = options.with_markup(markup);
    }
    if let Err(e) = state.telegram.send_message(token, chat_id, text, options).await {
        tracing::warn!("sendMessage to {} failed: {}", chat_id, e);
    }
}
