use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// PM Relay Hub server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "pmhub-server", version, about = "PM Relay Hub server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PMHUB_PORT", default_value = "8080")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "PMHUB_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./pmhub.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "PMHUB_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Public base URL this server is reachable at (used for webhook and
    /// challenge-page links)
    #[arg(long, env = "PMHUB_PUBLIC_URL", default_value = "http://localhost:8080")]
    pub public_url: String,

    /// Platform bot token
    #[arg(long, env = "PMHUB_BOT_TOKEN", default_value = "")]
    pub bot_token: String,

    /// Webhook secret for the platform bot's entry point
    #[arg(long, env = "PMHUB_BOT_SECRET", default_value = "")]
    pub bot_secret: String,

    /// Chat id of the platform administrator
    #[arg(long, env = "PMHUB_ADMIN_ID", default_value = "0")]
    pub admin_id: i64,

    /// Turnstile site key (embedded in the challenge page)
    #[arg(long, env = "PMHUB_TURNSTILE_SITE_KEY", default_value = "")]
    pub turnstile_site_key: String,

    /// Turnstile secret key (used server-side for siteverify)
    #[arg(long, env = "PMHUB_TURNSTILE_SECRET_KEY", default_value = "")]
    pub turnstile_secret_key: String,

    /// CAPTCHA verification endpoint
    #[arg(
        long,
        env = "PMHUB_TURNSTILE_VERIFY_URL",
        default_value = "https://challenges.cloudflare.com/turnstile/v0/siteverify"
    )]
    pub turnstile_verify_url: String,

    /// External fraud blacklist URL (plain text, one id per line)
    #[arg(
        long,
        env = "PMHUB_FRAUD_DB_URL",
        default_value = "https://raw.githubusercontent.com/MrMike92/Telegram-Fraud-Database/main/uid.txt"
    )]
    pub fraud_db_url: String,

    /// Telegram Bot API base URL (override for testing)
    #[arg(
        long,
        env = "PMHUB_TELEGRAM_API_BASE",
        default_value = "https://api.telegram.org"
    )]
    pub telegram_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            config: "./pmhub.toml".to_string(),
            json_logs: false,
            generate_config: false,
            public_url: "http://localhost:8080".to_string(),
            bot_token: String::new(),
            bot_secret: String::new(),
            admin_id: 0,
            turnstile_site_key: String::new(),
            turnstile_secret_key: String::new(),
            turnstile_verify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify"
                .to_string(),
            fraud_db_url:
                "https://raw.githubusercontent.com/MrMike92/Telegram-Fraud-Database/main/uid.txt"
                    .to_string(),
            telegram_api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (PMHUB_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("PMHUB_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# PM Relay Hub Server Configuration
# Place this file at ./pmhub.toml or specify with --config <path>
# All settings can be overridden via environment variables (PMHUB_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Public base URL this server is reachable at.
# Webhook registrations and challenge-page links are built from this.
# public_url = "https://pm.example.com"

# Platform bot token (from @BotFather)
# bot_token = ""

# Webhook secret for the platform bot's entry point.
# Telegram echoes it back in X-Telegram-Bot-Api-Secret-Token.
# bot_secret = ""

# Chat id of the platform administrator (the only user who may open the
# admin dashboard or register bots while registrations are closed)
# admin_id = 0

# ---- Human Verification (Cloudflare Turnstile) ----

# Site key, embedded in the challenge page
# turnstile_site_key = ""

# Secret key, used server-side against the siteverify endpoint
# turnstile_secret_key = ""

# Verification endpoint (default: Cloudflare's siteverify)
# turnstile_verify_url = "https://challenges.cloudflare.com/turnstile/v0/siteverify"

# ---- Fraud Blacklist ----

# Plain-text blacklist of known-scammer ids, checked after each relay.
# Lookups fail open: an unreachable list never blocks traffic.
# fraud_db_url = "https://raw.githubusercontent.com/MrMike92/Telegram-Fraud-Database/main/uid.txt"

# ---- Upstream ----

# Telegram Bot API base URL. Only override for testing.
# telegram_api_base = "https://api.telegram.org"
"#
    .to_string()
}
