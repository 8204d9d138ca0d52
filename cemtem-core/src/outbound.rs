//! Outbound delivery.
//!
//! Defines the [`OutboundChannel`] port each platform implements and
//! [`Outbound`], which routes a reply to the channel registered for the
//! recipient's platform. Telegram delivers directly to a chat; the web channel
//! publishes into the session's socket room through a [`RoomHub`].

mod recording;
mod web;

pub use recording::RecordingChannel;
pub use web::{BOT_REPLY_EVENT, BroadcastRoomHub, HttpRoomHub, RoomHub, RoomMessage, WebChannel};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::identity::{Identity, Platform};
use crate::reply::Reply;

/// Error type for delivery operations.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Nothing can deliver to this platform.
    #[error("no outbound channel for {0}")]
    NoChannel(Platform),

    /// The recipient address is not valid for the channel.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The transport rejected or failed the send.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A transport that can deliver a [`Reply`] to a platform-local address.
///
/// # Examples
///
/// ```
/// use cemtem_core::outbound::{OutboundChannel, RecordingChannel};
/// use cemtem_core::reply::Reply;
///
/// # async fn example() {
/// let channel = RecordingChannel::new();
/// channel.deliver("42", &Reply::text("hello")).await.unwrap();
/// assert_eq!(channel.sent()[0].0, "42");
/// # }
/// ```
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Deliver `reply` to `recipient` (chat id or web session id).
    async fn deliver(&self, recipient: &str, reply: &Reply) -> Result<(), DeliveryError>;
}

/// Routes replies by platform.
#[derive(Clone, Default)]
pub struct Outbound {
    channels: HashMap<Platform, Arc<dyn OutboundChannel>>,
}

impl Outbound {
    /// Router with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the channel for `platform`, replacing any previous one.
    #[must_use]
    pub fn with_channel(mut self, platform: Platform, channel: Arc<dyn OutboundChannel>) -> Self {
        self.channels.insert(platform, channel);
        self
    }

    /// Deliver `reply` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::NoChannel`] if no channel is registered for the
    /// platform, or the channel's own error.
    pub async fn send(&self, to: &Identity, reply: &Reply) -> Result<(), DeliveryError> {
        let channel = self
            .channels
            .get(&to.platform)
            .ok_or(DeliveryError::NoChannel(to.platform))?;
        tracing::debug!(recipient = %to, "delivering reply");
        channel.deliver(&to.id, reply).await
    }
}
