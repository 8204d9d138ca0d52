//! Startup helpers: bot token resolution and router assembly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cemtem_core::config::SessionConfig;
use cemtem_core::dispatch::Dispatcher;
use cemtem_core::extract::create_extractor;
use cemtem_core::flow::FlowEngine;
use cemtem_core::identity::Platform;
use cemtem_core::outbound::{
    BroadcastRoomHub, HttpRoomHub, Outbound, OutboundChannel, WebChannel,
};
use cemtem_core::projects::StaticProjectDirectory;
use cemtem_core::session::InMemorySessionStore;
use cemtem_core::storage::{Storage, create_storage};
use cemtem_core::{Config, Router};
use teloxide::Bot;
use tokio::task::JoinHandle;

use crate::channel::TelegramChannel;

#[cfg(test)]
mod tests;

/// Resolve the bot token with the following priority:
///
/// 1. `TELEGRAM_BOT_TOKEN` environment variable (if set and non-empty).
/// 2. `telegram.token` in `config.toml`.
///
/// The token is **never** passed to any tracing macro.
///
/// # Errors
///
/// Returns an error if neither source provides a token.
pub fn resolve_bot_token(config: &Config) -> anyhow::Result<String> {
    if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
        && !token.is_empty()
    {
        return Ok(token);
    }
    config
        .telegram
        .as_ref()
        .and_then(|t| t.token.clone())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Bot token required: set TELEGRAM_BOT_TOKEN env var or telegram.token in config"
            )
        })
}

/// Web reply channel: HTTP publish when `web.publish_url` is set, otherwise
/// the in-process broadcast hub.
pub fn web_channel(config: &Config) -> Arc<dyn OutboundChannel> {
    match config.web.as_ref().and_then(|w| w.publish_url.as_deref()) {
        Some(url) => {
            tracing::info!("Web replies published over HTTP");
            Arc::new(WebChannel::new(HttpRoomHub::new(url)))
        }
        None => {
            tracing::info!("No web.publish_url configured, web replies stay in process");
            Arc::new(WebChannel::new(BroadcastRoomHub::new()))
        }
    }
}

/// Flow engine with the configured extractor and project directory.
pub fn build_engine(config: &Config) -> FlowEngine {
    let extraction = config.extraction_or_default();
    FlowEngine::new()
        .with_extractor(Arc::from(create_extractor(&extraction)))
        .with_extraction_config(&extraction)
        .with_projects(Arc::new(StaticProjectDirectory::from_config(
            &config.projects,
        )))
}

/// Assemble the router: storage, outbound channels, dispatcher and engine.
///
/// # Errors
///
/// Returns an error if the storage backend cannot be opened.
pub async fn build_router(config: &Config, bot: Bot) -> anyhow::Result<Arc<Router>> {
    let db_url = config
        .storage
        .as_ref()
        .and_then(|s| s.database_url.as_deref());
    let storage: Arc<dyn Storage> = Arc::from(
        create_storage(db_url)
            .await
            .context("Failed to initialize storage")?,
    );

    let outbound = Outbound::new()
        .with_channel(Platform::Telegram, Arc::new(TelegramChannel::new(bot)))
        .with_channel(Platform::Web, web_channel(config));
    let dispatcher = Dispatcher::new(storage, outbound.clone(), config.dispatch_or_default());

    Ok(Arc::new(Router::new(
        Arc::new(InMemorySessionStore::new()),
        build_engine(config),
        dispatcher,
        outbound,
    )))
}

/// Periodically evict idle sessions.
pub fn spawn_session_sweeper(router: Arc<Router>, config: &SessionConfig) -> JoinHandle<()> {
    let max_idle = Duration::from_secs(config.idle_timeout_mins.saturating_mul(60));
    let every = Duration::from_secs(config.eviction_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = router.evict_stale(max_idle).await;
            if evicted > 0 {
                tracing::info!(evicted, "Evicted idle sessions");
            }
        }
    })
}
