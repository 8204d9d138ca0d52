//! Telegram slash commands.
//!
//! The core router owns command semantics on every platform; this module
//! registers the commands for Telegram's autocomplete UI and forwards them.

use std::sync::Arc;

use cemtem_core::Router;
use cemtem_core::identity::Identity;
use cemtem_core::inbound::InboundEvent;
use teloxide::prelude::*;
use teloxide::types::Message as TgMessage;
use teloxide::utils::command::BotCommands;

use crate::handlers::display_name;

#[cfg(test)]
mod tests;

/// All slash commands supported by the bot.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    /// Show the main menu, abandoning any flow in progress.
    #[command(description = "Start over from the main menu")]
    Start,
    /// Show usage help.
    #[command(description = "How to use the bot")]
    Help,
}

impl Command {
    /// Canonical text the core router understands.
    pub fn as_text(&self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Help => "/help",
        }
    }
}

/// Forward a parsed command to the router.
pub async fn handle_command(msg: TgMessage, cmd: Command, router: Arc<Router>) -> ResponseResult<()> {
    tracing::debug!(chat_id = msg.chat.id.0, command = cmd.as_text(), "command");
    let event = InboundEvent::message(Identity::telegram(msg.chat.id.0), cmd.as_text())
        .with_display_name(display_name(&msg));
    router.handle(event).await;
    Ok(())
}
