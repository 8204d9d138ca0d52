//! CemTem Telegram Bot: Telegram transport for the CemTem inquiry engine.
//!
//! Long-polls the Bot API and feeds every message and button press into the
//! `cemtem-core` router. Web chat messages relayed through the bot arrive
//! here too and are answered into their socket rooms.

mod channel;
mod commands;
mod handlers;
mod startup;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cemtem_core::Config;
use cemtem_core::config::Rotation;
use clap::Parser;
use startup::{build_router, resolve_bot_token, spawn_session_sweeper};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing_subscriber::prelude::*;

/// CemTem Telegram Bot: cement and TMT price inquiries
#[derive(Parser)]
#[command(name = "cemtem-telegram", version)]
struct Args {
    /// Path to a custom config file (overrides default search locations)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

/// Default tracing directives enabling info-level logs for this crate and cemtem-core.
const DEFAULT_DIRECTIVES: &[&str] = &["cemtem_telegram=info", "cemtem_core=info"];

/// Build the default `EnvFilter`: RUST_LOG (if set) plus our default directives.
fn default_env_filter() -> anyhow::Result<tracing_subscriber::EnvFilter> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Initialize the tracing subscriber.
///
/// With a `[logging]` section, logs go to stdout and a rolling file;
/// otherwise stdout only.
///
/// Returns the non-blocking writer guard that must be held for the process lifetime.
fn init_tracing(
    config: &Config,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(ref lc) = config.logging else {
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .init();
        return Ok(None);
    };

    if let Err(e) = std::fs::create_dir_all(&lc.directory) {
        eprintln!(
            "Warning: Failed to create log directory '{}': {}. Falling back to stdout-only.",
            lc.directory, e
        );
        tracing_subscriber::fmt()
            .with_env_filter(default_env_filter()?)
            .init();
        return Ok(None);
    }

    let rotation = match lc.rotation {
        Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
        Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
        Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
    };

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix("cemtem-telegram")
        .filename_suffix("log")
        .max_log_files(lc.max_files)
        .build(&lc.directory)
        .context("Failed to create rolling file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(default_env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Config first: tracing setup depends on it.
    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    let _guard = init_tracing(&config)?;

    tracing::info!("Starting CemTem Telegram Bot");

    // Token is never logged.
    let token = resolve_bot_token(&config).context("Failed to obtain bot token")?;
    let bot = Bot::new(token);

    let router = build_router(&config, bot.clone()).await?;
    let sweeper = spawn_session_sweeper(Arc::clone(&router), &config.session_or_default());

    // Required for filter_command to recognise `/cmd@BotName`.
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;

    // Autocomplete only; non-fatal on failure.
    if let Err(e) = bot.set_my_commands(commands::Command::bot_commands()).await {
        tracing::warn!("Failed to register bot commands: {}", e);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<commands::Command>()
                        .endpoint(commands::handle_command),
                )
                .branch(dptree::entry().endpoint(handlers::handle_message)),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

    tracing::info!(bot = %me.username(), "Dispatcher ready, polling for updates");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![me, Arc::clone(&router)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("Dispatcher stopped, shutting down");
    sweeper.abort();

    Ok(())
}
