mod blocklist;
mod config;
mod correlate;
mod counters;
mod dispatch;
mod fraud;
mod platform;
mod registry;
mod routes;
mod state;
mod store;
mod telegram;
mod verify;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use store::MemoryStore;
use telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pmhub_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pmhub_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("PM Relay Hub v{} starting", env!("CARGO_PKG_VERSION"));

    if config.bot_token.is_empty() || config.bot_secret.is_empty() {
        tracing::warn!(
            "bot_token/bot_secret not configured; the platform webhook will reject everything"
        );
    }

    let http = reqwest::Client::new();
    let telegram = Arc::new(TelegramClient::new(
        http.clone(),
        config.telegram_api_base.clone(),
    ));
    let store: Arc<dyn store::StateStore> = Arc::new(MemoryStore::new());

    let app_state = state::AppState {
        store,
        telegram,
        http,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
