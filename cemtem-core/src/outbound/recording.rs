//! Recording channel for testing.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{DeliveryError, OutboundChannel};
use crate::reply::Reply;

/// Channel that records every delivery instead of sending it.
///
/// Recipients registered with [`failing_for`](Self::failing_for) get a
/// [`DeliveryError::SendFailed`] and are not recorded.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, Reply)>>,
    failing: HashSet<String>,
}

impl RecordingChannel {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delivery to `recipient`.
    #[must_use]
    pub fn failing_for(mut self, recipient: impl Into<String>) -> Self {
        self.failing.insert(recipient.into());
        self
    }

    /// Deliveries so far, in order.
    pub fn sent(&self) -> Vec<(String, Reply)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replies delivered to `recipient`, in order.
    pub fn sent_to(&self, recipient: &str) -> Vec<Reply> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, reply)| reply)
            .collect()
    }
}

#[async_trait]
impl OutboundChannel for RecordingChannel {
    async fn deliver(&self, recipient: &str, reply: &Reply) -> Result<(), DeliveryError> {
        if self.failing.contains(recipient) {
            return Err(DeliveryError::SendFailed(format!(
                "recipient {} unreachable",
                recipient
            )));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push((recipient.to_string(), reply.clone())),
            Err(poisoned) => poisoned
                .into_inner()
                .push((recipient.to_string(), reply.clone())),
        }
        Ok(())
    }
}
