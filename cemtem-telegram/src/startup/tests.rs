use std::sync::Mutex;

use cemtem_core::config::{DispatchConfig, TelegramConfig};
use cemtem_core::identity::Identity;
use cemtem_core::inbound::InboundEvent;
use cemtem_core::storage::MemoryStorage;

use super::*;

/// Guards tests that mutate environment variables to prevent race conditions.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn config_with_token(token: &str) -> Config {
    Config {
        telegram: Some(TelegramConfig {
            token: Some(token.to_string()),
        }),
        ..Config::default()
    }
}

// Token resolution tests

#[test]
fn test_resolve_token_env_var() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex; single-threaded section.
    unsafe { std::env::set_var("TELEGRAM_BOT_TOKEN", "env-token-value") };

    let result = resolve_bot_token(&config_with_token("config-token"));
    assert_eq!(result.unwrap(), "env-token-value");

    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };
}

#[test]
fn test_resolve_token_config() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };

    let result = resolve_bot_token(&config_with_token("config-token"));
    assert_eq!(result.unwrap(), "config-token");
}

#[test]
fn test_resolve_token_none() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };

    let result = resolve_bot_token(&Config::default());
    let msg = result.unwrap_err().to_string();
    assert!(msg.contains("TELEGRAM_BOT_TOKEN"));

    let result = resolve_bot_token(&config_with_token(""));
    assert!(result.is_err());
}

#[test]
fn test_resolve_token_empty_env_var() {
    let _guard = ENV_MUTEX.lock().unwrap();
    // SAFETY: guarded by mutex.
    unsafe { std::env::set_var("TELEGRAM_BOT_TOKEN", "") };

    let result = resolve_bot_token(&config_with_token("fallback-config-token"));
    // Empty env var should fall through to config.
    assert_eq!(result.unwrap(), "fallback-config-token");

    // SAFETY: guarded by mutex.
    unsafe { std::env::remove_var("TELEGRAM_BOT_TOKEN") };
}

// Assembly tests

#[tokio::test]
async fn test_build_router_in_memory_serves_web_sessions() {
    let router = build_router(&Config::default(), Bot::new("123:test"))
        .await
        .unwrap();

    let reply = router
        .handle(InboundEvent::message(Identity::web("sess-1"), "/start"))
        .await
        .unwrap();
    assert!(reply.text.contains("1 Buy Materials"));
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_evicts_idle_sessions() {
    let sessions = Arc::new(InMemorySessionStore::new());
    let outbound = Outbound::new();
    let dispatcher = Dispatcher::new(
        Arc::new(MemoryStorage::new()),
        outbound.clone(),
        DispatchConfig::default(),
    );
    let router = Arc::new(Router::new(
        sessions.clone(),
        FlowEngine::new(),
        dispatcher,
        outbound,
    ));
    router
        .handle(InboundEvent::message(Identity::web("sess-1"), "/start"))
        .await;
    assert_eq!(sessions.len().await, 1);

    let config = SessionConfig {
        idle_timeout_mins: 0,
        eviction_interval_secs: 60,
    };
    let handle = spawn_session_sweeper(router, &config);
    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(sessions.is_empty().await);
    handle.abort();
}
