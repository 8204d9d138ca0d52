//! Telegram update handlers.
//!
//! Every update becomes an [`InboundEvent`] for the core router; replies go
//! back out through the router's outbound channels, not from here.

use std::sync::Arc;

use cemtem_core::Router;
use cemtem_core::identity::{Identity, Platform};
use cemtem_core::inbound::InboundEvent;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatAction, Message as TgMessage};

/// Handle a text message. Non-text updates are ignored.
///
/// Messages carrying the web relay envelope are routed to the web session
/// they name instead of this chat.
pub async fn handle_message(bot: Bot, msg: TgMessage, router: Arc<Router>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let mut event = InboundEvent::from_telegram(msg.chat.id.0, text);
    if event.identity.platform == Platform::Telegram {
        event = event.with_display_name(display_name(&msg));
        bot.send_chat_action(msg.chat.id, ChatAction::Typing)
            .await
            .ok();
    }

    router.handle(event).await;
    Ok(())
}

/// Handle an inline keyboard press.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, router: Arc<Router>) -> ResponseResult<()> {
    // Dismiss Telegram's loading spinner first.
    bot.answer_callback_query(q.id.clone()).await?;

    let data = match q.data.as_deref() {
        Some(d) if !d.is_empty() => d,
        _ => return Ok(()),
    };
    let Some(chat_id) = callback_chat_id(q.regular_message().map(|m| m.chat.id.0), q.from.id.0)
    else {
        tracing::warn!(user_id = q.from.id.0, "callback sender id out of range, skipping");
        return Ok(());
    };

    tracing::debug!(chat_id, data, "callback query");
    let event = InboundEvent::callback(Identity::telegram(chat_id), data)
        .with_display_name(Some(q.from.full_name()));
    router.handle(event).await;
    Ok(())
}

/// Chat to answer a callback in: the message's chat, else the sender's
/// private chat. `None` if the sender id doesn't fit a chat id.
fn callback_chat_id(message_chat: Option<i64>, sender: u64) -> Option<i64> {
    message_chat.or_else(|| i64::try_from(sender).ok())
}

/// Sender's full name, if Telegram reported a sender.
pub fn display_name(msg: &TgMessage) -> Option<String> {
    msg.from.as_ref().map(|u| u.full_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_chat_prefers_message_chat() {
        assert_eq!(callback_chat_id(Some(-100_123), 42), Some(-100_123));
        assert_eq!(callback_chat_id(None, 42), Some(42));
    }

    #[test]
    fn test_callback_sender_out_of_range_skipped() {
        assert_eq!(callback_chat_id(None, u64::MAX), None);
        assert_eq!(callback_chat_id(Some(7), u64::MAX), Some(7));
    }
}
