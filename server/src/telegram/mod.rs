//! Upstream Telegram Bot API transport: wire types and a thin HTTP client.

pub mod api;
pub mod client;

pub use api::*;
pub use client::{default_commands, TelegramClient, TelegramError};
