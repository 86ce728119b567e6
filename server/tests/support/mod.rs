//! Shared test harness: a fake Telegram Bot API server that records every
//! outgoing call, a fake CAPTCHA siteverify endpoint, and a helper that
//! boots the real router against both.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;

use pmhub_server::config::Config;
use pmhub_server::routes::build_router;
use pmhub_server::state::AppState;
use pmhub_server::store::{MemoryStore, StateStore};
use pmhub_server::telegram::TelegramClient;

pub const PLATFORM_TOKEN: &str = "1000:platformtoken";
pub const PLATFORM_SECRET: &str = "platform-secret";
pub const ADMIN_ID: i64 = 99;

/// One call the fake upstream received, with the canned response it gave
/// back (so tests can learn e.g. the message id a relay was assigned).
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub token: String,
    pub method: String,
    pub body: serde_json::Value,
    pub response: serde_json::Value,
}

impl RecordedCall {
    pub fn text(&self) -> &str {
        self.body["text"].as_str().unwrap_or("")
    }

    pub fn result_message_id(&self) -> i64 {
        self.response["result"]["message_id"].as_i64().unwrap()
    }
}

#[derive(Clone)]
struct FakeTelegramState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    next_message_id: Arc<AtomicI64>,
}

/// Fake Bot API. Canned behavior keyed off the token:
/// - tokens containing "invalid" fail getMe;
/// - tokens containing "hookfail" fail setWebhook;
/// - everything else succeeds, send/copy/forward returning fresh message ids.
async fn fake_telegram_handler(
    State(state): State<FakeTelegramState>,
    Path((token, method)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let response = match method.as_str() {
        "getMe" => {
            if token.contains("invalid") {
                json!({ "ok": false, "description": "Unauthorized" })
            } else {
                json!({ "ok": true, "result": { "id": 7, "username": "hosted_bot" } })
            }
        }
        "setWebhook" => {
            if token.contains("hookfail") {
                json!({ "ok": false, "description": "bad webhook: HTTPS url must be provided" })
            } else {
                json!({ "ok": true, "result": true })
            }
        }
        "sendMessage" | "copyMessage" => {
            let id = state.next_message_id.fetch_add(1, Ordering::SeqCst);
            json!({ "ok": true, "result": { "message_id": id } })
        }
        "editMessageText" | "answerCallbackQuery" | "setMyCommands" => {
            json!({ "ok": true, "result": true })
        }
        _ => json!({ "ok": false, "description": format!("unknown method {}", method) }),
    };

    state.calls.lock().unwrap().push(RecordedCall {
        token,
        method,
        body,
        response: response.clone(),
    });
    Json(response)
}

/// Start the fake Bot API; returns its base URL and the call recorder.
pub async fn start_fake_telegram() -> (String, Arc<Mutex<Vec<RecordedCall>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = FakeTelegramState {
        calls: calls.clone(),
        // Relayed message ids start high so they never collide with the
        // inbound ids tests make up.
        next_message_id: Arc::new(AtomicI64::new(5000)),
    };
    let app = Router::new()
        .route(
            "/bot{token}/{method}",
            axum::routing::post(fake_telegram_handler),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), calls)
}

/// Start a fake siteverify endpoint answering every submission with the
/// given verdict. Returns the full URL to point the config at.
pub async fn start_fake_siteverify(verdict: bool) -> String {
    let app = Router::new().route(
        "/siteverify",
        axum::routing::post(move || async move { Json(json!({ "success": verdict })) }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/siteverify", addr)
}

/// Start a fake fraud blacklist serving a fixed body (or an error status).
/// Returns the URL to point the config at.
pub async fn start_fake_blacklist(status: u16, body: &str) -> String {
    let status = axum::http::StatusCode::from_u16(status).unwrap();
    let body = body.to_string();
    let app = Router::new().route(
        "/uid.txt",
        axum::routing::get(move || async move { (status, body) }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/uid.txt", addr)
}

pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl TestServer {
    /// Calls the fake upstream saw for a given method, oldest first.
    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Boot the real router wired to a fake upstream and an always-pass
/// siteverify. The returned handle keeps the memory store so tests can
/// inspect keys and advance the TTL clock. The fraud list is unroutable by
/// default (the check must fail open); fraud tests point it at a fake.
pub async fn start_test_server() -> TestServer {
    start_test_server_with_fraud_list("http://127.0.0.1:1/uid.txt".to_string()).await
}

pub async fn start_test_server_with_fraud_list(fraud_db_url: String) -> TestServer {
    let (telegram_base, calls) = start_fake_telegram().await;
    let siteverify_url = start_fake_siteverify(true).await;

    // Bind before building config: public_url must point back at this server
    // for webhook and challenge links.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let config = Config {
        public_url: base_url.clone(),
        bot_token: PLATFORM_TOKEN.to_string(),
        bot_secret: PLATFORM_SECRET.to_string(),
        admin_id: ADMIN_ID,
        turnstile_site_key: "test-site-key".to_string(),
        turnstile_secret_key: "test-secret-key".to_string(),
        turnstile_verify_url: siteverify_url,
        fraud_db_url,
        telegram_api_base: telegram_base,
        ..Config::default()
    };

    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn StateStore> = memory.clone();
    let http = reqwest::Client::new();
    let state = AppState {
        store,
        telegram: Arc::new(TelegramClient::new(http.clone(), config.telegram_api_base.clone())),
        http,
        config: Arc::new(config),
    };

    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url,
        store: memory,
        calls,
    }
}

/// Inbound text-message update as Telegram would deliver it.
pub fn message_update(chat_id: i64, message_id: i64, text: &str) -> serde_json::Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": message_id,
            "from": { "id": chat_id, "first_name": "Alice", "username": "alice" },
            "chat": { "id": chat_id, "type": "private" },
            "text": text
        }
    })
}

/// Reply update: `chat_id` replying to an earlier message `replied_to_id`.
pub fn reply_update(
    chat_id: i64,
    message_id: i64,
    replied_to_id: i64,
    text: &str,
) -> serde_json::Value {
    json!({
        "update_id": 1,
        "message": {
            "message_id": message_id,
            "from": { "id": chat_id, "first_name": "Owner" },
            "chat": { "id": chat_id, "type": "private" },
            "text": text,
            "reply_to_message": {
                "message_id": replied_to_id,
                "chat": { "id": chat_id, "type": "private" }
            }
        }
    })
}

/// Inline-button press update originating from `chat_id`.
pub fn callback_update(chat_id: i64, data: &str) -> serde_json::Value {
    json!({
        "update_id": 1,
        "callback_query": {
            "id": "cq-test",
            "data": data,
            "message": {
                "message_id": 77,
                "chat": { "id": chat_id, "type": "private" }
            }
        }
    })
}

/// POST an update to the platform webhook with the given secret header.
pub async fn post_platform(
    client: &reqwest::Client,
    server: &TestServer,
    secret: &str,
    update: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{}/endpoint", server.base_url))
        .header("X-Telegram-Bot-Api-Secret-Token", secret)
        .json(update)
        .send()
        .await
        .unwrap()
}

/// POST an update to a route webhook with the given secret header.
pub async fn post_route(
    client: &reqwest::Client,
    server: &TestServer,
    route_id: &str,
    secret: &str,
    update: &serde_json::Value,
) -> reqwest::Response {
    client
        .post(format!("{}/entry/{}", server.base_url, route_id))
        .header("X-Telegram-Bot-Api-Secret-Token", secret)
        .json(update)
        .send()
        .await
        .unwrap()
}

/// Register a route for `owner_id` through the platform webhook and pull the
/// generated route id + secret out of the store's owner index.
pub async fn register_route(
    client: &reqwest::Client,
    server: &TestServer,
    owner_id: i64,
) -> (String, String) {
    let update = message_update(owner_id, 1, "2000:AAvalidtokenvalidtokenvalidtokenvalidtoken");
    let resp = post_platform(client, server, PLATFORM_SECRET, &update).await;
    assert_eq!(resp.status(), 200);

    // Route + index are persisted before the webhook responds; only the
    // counter increment is detached.
    let index: serde_json::Value = pmhub_server::store::get_json(
        server.store.as_ref(),
        &format!("platform:user:{}", owner_id),
    )
    .await
    .unwrap()
    .expect("owner index should exist after registration");
    let route_id = index["routeId"].as_str().unwrap().to_string();
    let secret = index["secret"].as_str().unwrap().to_string();
    (route_id, secret)
}

/// Detached counter increments race the response; poll briefly instead of
/// sleeping a fixed amount.
pub async fn wait_for_counter(server: &TestServer, key: &str) {
    for _ in 0..50 {
        if server.store.get(key).await.unwrap().is_some() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("counter {} never appeared", key);
}
