//! Bot API client. One reqwest client, token passed per call because the
//! platform speaks for many bots (its own plus every hosted route's).

use serde::de::DeserializeOwned;
use serde_json::json;

use super::api::{
    ApiResponse, BotCommand, BotIdentity, InlineKeyboardMarkup, MessageOptions, SentMessage,
};

/// Error from an upstream Bot API call.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream accepted the request but rejected the operation
    /// (`ok: false` envelope).
    #[error("Telegram API error: {0}")]
    Api(String),

    /// Upstream returned success without a result payload.
    #[error("Telegram API response missing result")]
    MissingResult,
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramClient {
    /// `api_base` is normally `https://api.telegram.org`; tests point it at
    /// a local fake.
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, TelegramError> {
        let resp = self
            .http
            .post(self.method_url(token, method))
            .json(body)
            .send()
            .await?;

        let envelope: ApiResponse<T> = resp.json().await?;
        if !envelope.ok {
            return Err(TelegramError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| "unknown".to_string()),
            ));
        }
        envelope.result.ok_or(TelegramError::MissingResult)
    }

    /// sendMessage. Returns the sent message id.
    pub async fn send_message(
        &self,
        token: &str,
        chat_id: i64,
        text: &str,
        options: MessageOptions,
    ) -> Result<SentMessage, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = options.parse_mode {
            body["parse_mode"] = json!(mode);
        }
        if let Some(markup) = options.reply_markup {
            body["reply_markup"] = serde_json::to_value(markup).unwrap_or_default();
        }
        self.call(token, "sendMessage", &body).await
    }

    /// copyMessage: re-send a message's content into another chat without a
    /// forward header, so the sender's account stays hidden.
    pub async fn copy_message(
        &self,
        token: &str,
        to_chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<SentMessage, TelegramError> {
        let mut body = json!({
            "chat_id": to_chat_id,
            "from_chat_id": from_chat_id,
            "message_id": message_id,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup).unwrap_or_default();
        }
        self.call(token, "copyMessage", &body).await
    }

    /// editMessageText: rewrite an already-sent message in place (used for
    /// the admin dashboard re-render).
    pub async fn edit_message_text(
        &self,
        token: &str,
        chat_id: i64,
        message_id: i64,
        text: &str,
        options: MessageOptions,
    ) -> Result<(), TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if let Some(mode) = options.parse_mode {
            body["parse_mode"] = json!(mode);
        }
        if let Some(markup) = options.reply_markup {
            body["reply_markup"] = serde_json::to_value(markup).unwrap_or_default();
        }
        // editMessageText returns the edited Message (or true); we only care
        // that it succeeded.
        let _: serde_json::Value = self.call(token, "editMessageText", &body).await?;
        Ok(())
    }

    /// answerCallbackQuery: acknowledge a button press, optionally with a
    /// toast or alert.
    pub async fn answer_callback_query(
        &self,
        token: &str,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "callback_query_id": callback_query_id,
            "text": text,
            "show_alert": show_alert,
        });
        let _: bool = self.call(token, "answerCallbackQuery", &body).await?;
        Ok(())
    }

    /// setWebhook with a secret token that Telegram echoes back in the
    /// `X-Telegram-Bot-Api-Secret-Token` header of every delivery.
    pub async fn set_webhook(
        &self,
        token: &str,
        url: &str,
        secret_token: &str,
        allowed_updates: &[&str],
    ) -> Result<bool, TelegramError> {
        let body = json!({
            "url": url,
            "secret_token": secret_token,
            "allowed_updates": allowed_updates,
        });
        self.call(token, "setWebhook", &body).await
    }

    /// getMe: capability probe used to validate a candidate bot credential.
    pub async fn get_me(&self, token: &str) -> Result<BotIdentity, TelegramError> {
        self.call(token, "getMe", &json!({})).await
    }

    /// setMyCommands: install the bot's command menu. Idempotent.
    pub async fn set_my_commands(
        &self,
        token: &str,
        commands: &[BotCommand],
    ) -> Result<bool, TelegramError> {
        let body = json!({ "commands": commands });
        self.call(token, "setMyCommands", &body).await
    }
}

/// The command menu installed on every hosted bot.
pub fn default_commands() -> Vec<BotCommand> {
    vec![BotCommand {
        command: "start".to_string(),
        description: "Get started / show the guide".to_string(),
    }]
}
