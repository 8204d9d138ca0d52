//! Web chat delivery through socket rooms.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::{DeliveryError, OutboundChannel};
use crate::identity::room_for_session;
use crate::reply::Reply;

/// Socket event name web clients listen for.
pub const BOT_REPLY_EVENT: &str = "bot-reply";

/// Buffered events per [`BroadcastRoomHub`] before slow subscribers lag.
const BROADCAST_CAPACITY: usize = 256;

/// One event published into a web room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    /// Target room, `session-{id}`.
    pub room: String,
    /// Event name, [`BOT_REPLY_EVENT`].
    pub event: String,
    /// Web session id.
    pub session_id: String,
    /// Message text.
    pub message: String,
}

impl RoomMessage {
    /// A `bot-reply` event for `session_id`.
    pub fn bot_reply(session_id: &str, message: impl Into<String>) -> Self {
        Self {
            room: room_for_session(session_id),
            event: BOT_REPLY_EVENT.to_string(),
            session_id: session_id.to_string(),
            message: message.into(),
        }
    }
}

/// Port for publishing into web socket rooms.
#[async_trait]
pub trait RoomHub: Send + Sync {
    /// Publish one event.
    async fn publish(&self, message: &RoomMessage) -> Result<(), DeliveryError>;
}

/// [`OutboundChannel`] for the web platform.
///
/// Web clients have no inline keyboards, so buttons are rendered into the text.
pub struct WebChannel<H> {
    hub: H,
}

impl<H: RoomHub> WebChannel<H> {
    /// Channel publishing through `hub`.
    pub fn new(hub: H) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl<H: RoomHub> OutboundChannel for WebChannel<H> {
    async fn deliver(&self, recipient: &str, reply: &Reply) -> Result<(), DeliveryError> {
        if recipient.is_empty() {
            return Err(DeliveryError::InvalidRecipient("empty session id".to_string()));
        }
        self.hub
            .publish(&RoomMessage::bot_reply(recipient, reply.plain_text()))
            .await
    }
}

/// Hub that POSTs events to the web server's internal publish endpoint.
pub struct HttpRoomHub {
    client: reqwest::Client,
    url: String,
}

impl HttpRoomHub {
    /// Hub posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RoomHub for HttpRoomHub {
    async fn publish(&self, message: &RoomMessage) -> Result<(), DeliveryError> {
        tracing::debug!(room = %message.room, "web: POST room event");
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DeliveryError::SendFailed(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

/// In-process hub over a tokio broadcast channel.
///
/// Used when no publish endpoint is configured; an embedding web server can
/// [`subscribe`](Self::subscribe) and forward events to its sockets.
#[derive(Debug, Clone)]
pub struct BroadcastRoomHub {
    sender: broadcast::Sender<RoomMessage>,
}

impl Default for BroadcastRoomHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastRoomHub {
    /// Hub with the default buffer.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomMessage> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl RoomHub for BroadcastRoomHub {
    async fn publish(&self, message: &RoomMessage) -> Result<(), DeliveryError> {
        if self.sender.send(message.clone()).is_err() {
            tracing::debug!(room = %message.room, "no web subscribers, room event dropped");
        }
        Ok(())
    }
}
