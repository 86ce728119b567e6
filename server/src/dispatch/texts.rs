//! User-facing text and inline keyboards. Pure functions, no state; the
//! dispatcher decides when to send what.

use crate::platform::PlatformConfig;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

// Callback data values understood by the platform webhook.
pub const CB_ADMIN_TOGGLE_ACCESS: &str = "admin_toggle_access";
pub const CB_ADMIN_TTL_MENU: &str = "admin_ttl_menu";
pub const CB_ADMIN_SET_TTL_PREFIX: &str = "admin_set_ttl_";
pub const CB_ADMIN_REFRESH: &str = "admin_refresh";

// Callback data values understood by route webhooks.
pub const CB_BLOCK_PREFIX: &str = "block_";
pub const CB_UNBLOCK_PREFIX: &str = "unblock_";
pub const CB_REPLY_PLACEHOLDER: &str = "reply_placeholder";

pub const OWNER_HELP: &str = "\
\u{1F44B} **Hello, admin!**\n\
\n\
Your private-message bot is up and running.\n\
\n\
\u{1F4DD} **How to use it:**\n\
\n\
1. **Receiving messages**\n\
   When someone messages this bot, you get the message relayed here instantly.\n\
\n\
2. **Replying**\n\
   Simply **reply** (swipe left) to a relayed message to answer the sender.\n\
\n\
3. **Managing users**\n\
   \u{2022} **Block / unblock**: use the buttons under a message, or reply with `/block` / `/unblock`.\n\
   \u{2022} **Profile**: tap the sender's name under a message.\n\
\n\
\u{1F4A1} *New users must pass a human-verification check on first contact, which filters out spam.*";

pub const PLATFORM_WELCOME: &str = "\
\u{1F916} **Welcome to the PM Bot hosting platform**\n\
\n\
Create your own **private-message relay bot** for free.\n\
It receives messages from strangers, hides your real account, and filters spam automatically.\n\
\n\
\u{1F31F} **Features:**\n\
\u{2022} **Smart verification**: blocks bots and ad spam.\n\
\u{2022} **Private replies**: answer directly, the other side never sees your account.\n\
\u{2022} **One-tap management**: block/unblock buttons under every message.\n\
\u{2022} **Statistics**: see how many people contacted you.\n\
\n\
\u{1F680} **Getting started:**\n\
Just send me your **Bot Token**.\n\
*(No token yet? Get one from @BotFather first.)*";

pub const VISITOR_WELCOME: &str = "\
\u{1F44B} **Hi! This is a private-message bot**\n\
\n\
Send your message here and the owner will see it and get back to you.\n\
\n\
\u{26A0} *Note: all messages are recorded. Please do not send spam.*";

pub const BLOCKED_NOTICE: &str = "\u{1F6AB} **You have been blocked by the admin**";

pub const REGISTRATION_CLOSED: &str = "\
\u{26D4} **Platform under maintenance**\n\
\n\
The admin has temporarily paused new bot registrations. Please try again later.";

pub const REGISTRATION_IN_PROGRESS: &str =
    "\u{23F3} Validating token and deploying, please wait...";

pub const REGISTRATION_INVALID_TOKEN: &str = "\
\u{274C} **Invalid token**\n\
Check that you copied it completely.";

pub const VERIFY_PROMPT: &str = "\
\u{1F6E1} **Security check**\n\
\n\
To keep spam out, please verify you are human to continue.";

pub fn registration_failed(description: &str) -> String {
    format!("\u{274C} **Deployment failed**: {}", description)
}

pub fn registration_success(bot_username: &str) -> String {
    // Underscores in the handle would toggle Markdown italics.
    let safe_username = bot_username.replace('_', "\\_");
    format!(
        "\u{2705} **Deployed!**\n\
         \n\
         Your private-message bot is ready: @{}\n\
         \n\
         \u{1F449} **Next step**:\n\
         Open your bot and tap the **menu** button or send **/start** to begin.",
        safe_username
    )
}

pub fn blocked_ack(visitor_id: &str) -> String {
    format!("\u{1F6AB} User {} blocked", visitor_id)
}

pub fn unblocked_ack(visitor_id: &str) -> String {
    format!("\u{2705} User {} unblocked", visitor_id)
}

pub fn fraud_alert(visitor_id: i64) -> String {
    format!(
        "\u{26A0} **Warning**: sender UID {} appears on the scam blacklist!",
        visitor_id
    )
}

fn ttl_label(ttl_secs: u64) -> String {
    let days = ttl_secs / 86_400;
    if days > 365 {
        "forever".to_string()
    } else if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

/// Admin dashboard: platform stats plus the global settings, with the toggle
/// buttons reflecting the current state.
pub fn dashboard(config: &PlatformConfig, total_routes: i64) -> (String, InlineKeyboardMarkup) {
    let ttl = ttl_label(config.verify_ttl);
    let text = format!(
        "\u{1F39B} **Platform admin panel**\n\
         \n\
         \u{1F4CA} **Stats**:\n\
         \u{2022} Hosted bots: {}\n\
         \n\
         \u{1F527} **Global settings**:\n\
         \u{2022} New registrations: {}\n\
         \u{2022} Verification validity: {} (global default)\n\
         \n\
         Choose an action:",
        total_routes,
        if config.enable_new_users {
            "\u{2705} open"
        } else {
            "\u{26D4} closed"
        },
        ttl,
    );

    let toggle_label = if config.enable_new_users {
        "\u{26D4} Close registrations"
    } else {
        "\u{1F7E2} Open registrations"
    };
    let markup = InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::callback(
                toggle_label,
                CB_ADMIN_TOGGLE_ACCESS,
            )],
            vec![InlineKeyboardButton::callback(
                format!("\u{23F3} Verification validity ({})", ttl),
                CB_ADMIN_TTL_MENU,
            )],
            vec![InlineKeyboardButton::callback(
                "\u{1F504} Refresh",
                CB_ADMIN_REFRESH,
            )],
        ],
    };
    (text, markup)
}

/// TTL picker shown from the dashboard. "Forever" is 365 days; the store
/// backend needs a finite expiry.
pub fn ttl_menu(current_ttl_secs: u64) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "\u{23F3} **Default verification validity**\n\
         \n\
         How long does a passed verification stay valid?\n\
         Current: **{}**",
        ttl_label(current_ttl_secs),
    );
    let set = |label: &str, days: u32| {
        InlineKeyboardButton::callback(label, format!("{}{}", CB_ADMIN_SET_TTL_PREFIX, days))
    };
    let markup = InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![set("1 day", 1), set("7 days", 7)],
            vec![set("30 days", 30), set("Forever", 365)],
            vec![InlineKeyboardButton::callback(
                "\u{1F519} Back",
                CB_ADMIN_REFRESH,
            )],
        ],
    };
    (text, markup)
}

/// Inline controls attached to every relayed visitor message.
pub fn relay_controls(visitor: &crate::telegram::User) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::url(
                    format!("\u{1F464} {}", visitor.display_name()),
                    format!("tg://user?id={}", visitor.id),
                ),
                InlineKeyboardButton::callback(
                    format!("\u{1F194} {}", visitor.id),
                    CB_REPLY_PLACEHOLDER,
                ),
            ],
            vec![
                InlineKeyboardButton::callback(
                    "\u{1F6AB} Block",
                    format!("{}{}", CB_BLOCK_PREFIX, visitor.id),
                ),
                InlineKeyboardButton::callback(
                    "\u{2705} Unblock",
                    format!("{}{}", CB_UNBLOCK_PREFIX, visitor.id),
                ),
            ],
        ],
    }
}

/// Verification prompt keyboard: one web-app button opening the challenge
/// page with the visitor's identity threaded through the query string.
pub fn verify_keyboard(challenge_url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::web_app(
            "\u{1F916} Verify",
            challenge_url,
        )]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_label_rounds_to_days() {
        assert_eq!(ttl_label(86_400), "1 day");
        assert_eq!(ttl_label(30 * 86_400), "30 days");
        assert_eq!(ttl_label(366 * 86_400), "forever");
    }

    #[test]
    fn test_registration_success_escapes_underscores() {
        let text = registration_success("my_pm_bot");
        assert!(text.contains("@my\\_pm\\_bot"));
    }

    #[test]
    fn test_dashboard_toggle_reflects_state() {
        let open = PlatformConfig {
            enable_new_users: true,
            verify_ttl: 86_400,
        };
        let (_, markup) = dashboard(&open, 3);
        assert!(markup.inline_keyboard[0][0].text.contains("Close"));

        let closed = PlatformConfig {
            enable_new_users: false,
            verify_ttl: 86_400,
        };
        let (_, markup) = dashboard(&closed, 3);
        assert!(markup.inline_keyboard[0][0].text.contains("Open"));
    }
}
