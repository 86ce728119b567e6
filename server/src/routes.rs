use axum::{http::StatusCode, Json, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::dispatch::{platform as platform_hook, route as route_hook};
use crate::state::AppState;
use crate::verify::page;

/// GET /registerWebhook — One-shot setup: point the platform bot's webhook
/// at this deployment. Returns the upstream response as-is so the operator
/// can see what Telegram said.
async fn register_webhook(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let url = format!(
        "{}/endpoint",
        state.config.public_url.trim_end_matches('/')
    );
    match state
        .telegram
        .set_webhook(
            &state.config.bot_token,
            &url,
            &state.config.bot_secret,
            &["message", "callback_query"],
        )
        .await
    {
        Ok(ok) => Ok(Json(serde_json::json!({ "ok": ok, "url": url }))),
        Err(e) => Err((StatusCode::BAD_GATEWAY, e.to_string())),
    }
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting on the public challenge endpoints: 10 requests per
    // minute per IP. Uses PeerIpKeyExtractor which reads from
    // ConnectInfo<SocketAddr>.
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(6) // 1 token every 6 seconds = 10 per minute
            .burst_size(10)
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Challenge page + submission with rate limiting
    let challenge_routes = Router::new()
        .route("/verify", axum::routing::get(page::challenge_page))
        .route("/verify_submit", axum::routing::post(page::submit_challenge))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Webhook entry points (authenticated by secret header, not rate-limited:
    // the upstream is the only legitimate caller and it retries on 429)
    let webhook_routes = Router::new()
        .route("/endpoint", axum::routing::post(platform_hook::webhook))
        .route("/entry/{route_id}", axum::routing::post(route_hook::webhook));

    // Operator setup endpoint
    let setup_routes = Router::new()
        .route("/registerWebhook", axum::routing::get(register_webhook));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(webhook_routes)
        .merge(challenge_routes)
        .merge(setup_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
