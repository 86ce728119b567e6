use std::sync::Arc;

use crate::config::Config;
use crate::store::StateStore;
use crate::telegram::TelegramClient;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Durable key-value state (routes, verification records, counters)
    pub store: Arc<dyn StateStore>,
    /// Upstream Bot API client (platform bot and every hosted route's bot)
    pub telegram: Arc<TelegramClient>,
    /// Plain HTTP client for CAPTCHA verification and the fraud list
    pub http: reqwest::Client,
    /// Server config
    pub config: Arc<Config>,
}
