//! Telegram delivery for core replies.
//!
//! Replies are sent as plain text: flow prompts echo user input, so no parse
//! mode is set. Buttons become an inline keyboard on the last chunk.

use async_trait::async_trait;
use cemtem_core::outbound::{DeliveryError, OutboundChannel};
use cemtem_core::reply::{Button, Reply};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Telegram's maximum message length in characters.
const TELEGRAM_MSG_LIMIT: usize = 4096;

/// [`OutboundChannel`] sending through the Bot API.
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl OutboundChannel for TelegramChannel {
    async fn deliver(&self, recipient: &str, reply: &Reply) -> Result<(), DeliveryError> {
        let chat_id: i64 = recipient
            .parse()
            .map_err(|_| DeliveryError::InvalidRecipient(format!("not a chat id: {}", recipient)))?;

        let chunks = chunk_message(&reply.text);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut request = self.bot.send_message(ChatId(chat_id), chunk);
            if i == last
                && let Some(markup) = build_keyboard(&reply.buttons)
            {
                request = request.reply_markup(markup);
            }
            request
                .await
                .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }
}

/// One button per row, callback data passed through unchanged.
pub fn build_keyboard(buttons: &[Button]) -> Option<InlineKeyboardMarkup> {
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .iter()
        .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.data.clone())])
        .collect();
    Some(InlineKeyboardMarkup::new(rows))
}

/// Split a message into chunks that fit within Telegram's 4096-character limit.
///
/// Chunks are measured in UTF-8 bytes, which never undercounts the limit.
///
/// Splitting priority:
/// 1. Paragraph boundaries (`\n\n`)
/// 2. Newline boundaries (`\n`)
/// 3. Space boundaries
/// 4. Hard split at the limit (last resort)
pub fn chunk_message(text: &str) -> Vec<&str> {
    if text.len() <= TELEGRAM_MSG_LIMIT {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > TELEGRAM_MSG_LIMIT {
        let limit = floor_char_boundary(remaining, TELEGRAM_MSG_LIMIT);
        let slice = &remaining[..limit];

        let split_at = slice
            .rfind("\n\n")
            .or_else(|| slice.rfind('\n'))
            .or_else(|| slice.rfind(' '))
            .map(|pos| pos + 1)
            .unwrap_or(limit);

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        remaining = rest.trim_start_matches('\n');
    }

    if !remaining.is_empty() {
        chunks.push(remaining);
    }

    chunks
}

/// Largest char boundary in `s` at or below `idx`.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    #[test]
    fn test_keyboard_one_button_per_row() {
        let reply = Reply::text("New inquiry")
            .with_button("💰 Enter rate", "rate_custom_INQ-1")
            .with_button("Skip", "skip");

        let markup = build_keyboard(&reply.buttons).unwrap();
        let rows = markup.inline_keyboard;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].text, "💰 Enter rate");
        if let InlineKeyboardButtonKind::CallbackData(d) = &rows[0][0].kind {
            assert_eq!(d, "rate_custom_INQ-1");
        } else {
            panic!("Expected CallbackData");
        }
    }

    #[test]
    fn test_no_buttons_no_keyboard() {
        assert!(build_keyboard(&[]).is_none());
    }

    #[tokio::test]
    async fn test_non_numeric_recipient_rejected() {
        let channel = TelegramChannel::new(Bot::new("123:test"));
        let err = channel
            .deliver("sess-1", &Reply::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidRecipient(_)));
    }

    #[test]
    fn test_chunk_short_message() {
        let text = "Hello, world!";
        let chunks = chunk_message(text);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_chunk_long_message() {
        let text = "a".repeat(5000);
        let chunks = chunk_message(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= TELEGRAM_MSG_LIMIT);
        }
        assert_eq!(chunks.join(""), text);
    }

    #[test]
    fn test_chunk_at_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(3000), "b".repeat(3000));
        let chunks = chunk_message(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn test_chunk_multibyte_without_spaces() {
        let text = "₹".repeat(2000);
        let chunks = chunk_message(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= TELEGRAM_MSG_LIMIT);
        }
        assert_eq!(chunks.concat(), text);
    }
}
