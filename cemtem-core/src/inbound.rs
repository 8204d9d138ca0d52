//! Inbound event normalisation.
//!
//! Every transport produces an [`InboundEvent`]. Telegram messages carrying
//! the web relay envelope (`[API] Session: <id> | User: <id>` on the first
//! line) are re-attributed to the web session they came from.

use std::sync::LazyLock;

use regex::Regex;

use crate::identity::Identity;

static API_ENVELOPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\[API\]\s*Session:\s*([^\s|]+)\s*\|\s*User:\s*([^\s]+)[ \t]*\r?\n(.*)$")
        .expect("API envelope pattern is valid")
});

/// One message or button press from any platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Who sent it.
    pub identity: Identity,
    /// Message text; empty for button presses.
    pub text: String,
    /// Button payload, if this is a button press.
    pub callback_data: Option<String>,
    /// Sender's display name, if the platform provides one.
    pub display_name: Option<String>,
}

impl InboundEvent {
    /// A text message.
    pub fn message(identity: Identity, text: impl Into<String>) -> Self {
        Self {
            identity,
            text: text.into(),
            callback_data: None,
            display_name: None,
        }
    }

    /// A button press.
    pub fn callback(identity: Identity, data: impl Into<String>) -> Self {
        Self {
            identity,
            text: String::new(),
            callback_data: Some(data.into()),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// A Telegram text message, unwrapping the web relay envelope if present.
    pub fn from_telegram(chat_id: i64, text: &str) -> Self {
        match parse_api_envelope(text) {
            Some(envelope) => {
                tracing::debug!(session = %envelope.session_id, "relayed web message");
                Self::message(Identity::web(envelope.session_id), envelope.text)
            }
            None => Self::message(Identity::telegram(chat_id), text),
        }
    }
}

/// A web message relayed through the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEnvelope {
    /// Web session id; the identity the message belongs to.
    pub session_id: String,
    /// Web user id.
    pub user_id: String,
    /// The user's text.
    pub text: String,
}

/// Parse `[API] Session: <id> | User: <id>\n<text>`.
pub fn parse_api_envelope(text: &str) -> Option<ApiEnvelope> {
    let captures = API_ENVELOPE.captures(text)?;
    Some(ApiEnvelope {
        session_id: captures[1].to_string(),
        user_id: captures[2].to_string(),
        text: captures[3].trim().to_string(),
    })
}
