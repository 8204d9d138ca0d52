//! Platform-qualified conversation identities.
//!
//! Every participant is addressed by an [`Identity`]: a Telegram chat id or a
//! web chat session id, tagged with the [`Platform`] it came from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Delivery platform a conversation participant is reachable on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Telegram Bot API chat.
    Telegram,
    /// Companion web chat (socket room per session).
    Web,
}

impl Platform {
    /// Stable lowercase name, as stored alongside inquiries.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Telegram => "telegram",
            Platform::Web => "web",
        }
    }

    /// Parse a stored platform name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "telegram" => Some(Platform::Telegram),
            "web" => Some(Platform::Web),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A platform-qualified address for one conversation participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Platform the participant talks through.
    pub platform: Platform,
    /// Chat id (Telegram) or session id (web).
    pub id: String,
}

impl Identity {
    /// Identity for a Telegram chat.
    pub fn telegram(chat_id: impl ToString) -> Self {
        Self {
            platform: Platform::Telegram,
            id: chat_id.to_string(),
        }
    }

    /// Identity for a web chat session.
    pub fn web(session_id: impl Into<String>) -> Self {
        Self {
            platform: Platform::Web,
            id: session_id.into(),
        }
    }

    /// Socket room a web session's replies are published to.
    pub fn room(&self) -> String {
        room_for_session(&self.id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.platform, self.id)
    }
}

/// Room name for a web session id.
pub fn room_for_session(session_id: &str) -> String {
    format!("session-{}", session_id)
}
