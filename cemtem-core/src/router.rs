//! Inbound event routing.
//!
//! The [`Router`] is the single entry point for every transport. It loads
//! the sender's session, decides whether the event is a command, a rate
//! submission or a flow step, persists the new state, runs any completion
//! action and delivers the reply through [`Outbound`].
//!
//! Events for the same identity are handled one at a time, from session load
//! to reply delivery. Different identities proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::dispatch::{Dispatcher, SAVE_FAILED};
use crate::flow::{self, FlowEngine, Step, Turn};
use crate::identity::Identity;
use crate::inbound::InboundEvent;
use crate::outbound::Outbound;
use crate::rates::{RateEntry, RateProgress, parse_rate_callback, parse_rate_message};
use crate::reply::Reply;
use crate::session::{Session, SessionStore};


/// Slash commands understood on every platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
}

/// Recognise `/start` and `/help`, tolerating a `@BotName` suffix.
fn parse_command(text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        _ => None,
    }
}

/// Routes inbound events through sessions, the flow engine and the dispatcher.
pub struct Router {
    sessions: Arc<dyn SessionStore>,
    engine: FlowEngine,
    dispatcher: Dispatcher,
    outbound: Outbound,
    locks: Mutex<HashMap<Identity, Arc<Mutex<()>>>>,
}

impl Router {
    /// Create a router. `outbound` delivers replies to the sender.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        engine: FlowEngine,
        dispatcher: Dispatcher,
        outbound: Outbound,
    ) -> Self {
        Self {
            sessions,
            engine,
            dispatcher,
            outbound,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one event and deliver the reply, if any, to its sender.
    ///
    /// The reply is also returned. Delivery failures are logged only.
    pub async fn handle(&self, event: InboundEvent) -> Option<Reply> {
        let lock = self.lock_for(&event.identity).await;
        let _guard = lock.lock().await;

        let reply = self.process(&event).await?;
        if let Err(e) = self.outbound.send(&event.identity, &reply).await {
            tracing::warn!(identity = %event.identity, error = %e, "reply delivery failed");
        }
        Some(reply)
    }

    /// Evict idle sessions and drop locks nobody is waiting on.
    ///
    /// Returns the number of sessions evicted.
    pub async fn evict_stale(&self, max_idle: Duration) -> usize {
        let evicted = self.sessions.evict_stale(max_idle).await;
        self.locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        evicted
    }

    async fn lock_for(&self, identity: &Identity) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(identity.clone()).or_default().clone()
    }

    async fn process(&self, event: &InboundEvent) -> Option<Reply> {
        let identity = &event.identity;

        if let Some(data) = &event.callback_data {
            return self.handle_callback(identity, data).await;
        }

        let text = event.text.trim();
        match parse_command(text) {
            Some(Command::Start) => {
                tracing::debug!(identity = %identity, "session reset");
                self.sessions.set(identity, Session::new()).await;
                return Some(flow::welcome());
            }
            Some(Command::Help) => return Some(flow::help()),
            None => {}
        }

        let mut session = self.sessions.get(identity).await;
        if let Some(entry) = session.as_mut().and_then(|s| s.rate_entry.take()) {
            let current = session.unwrap_or_default();
            return self.continue_rate_entry(identity, current, entry, text).await;
        }

        if let Some(quote) = parse_rate_message(text) {
            tracing::debug!(identity = %identity, inquiry_id = %quote.inquiry_id, "free-text quote");
            return self.dispatcher.submit_quote(identity, &quote).await;
        }

        let Some(session) = session else {
            self.sessions.set(identity, Session::new()).await;
            return Some(flow::welcome());
        };
        self.advance_flow(event, session, text).await
    }

    async fn handle_callback(&self, identity: &Identity, data: &str) -> Option<Reply> {
        let Some(inquiry_id) = parse_rate_callback(data) else {
            tracing::debug!(identity = %identity, data, "ignoring unknown callback");
            return None;
        };

        let mut session = self.sessions.get(identity).await.unwrap_or_default();
        let (entry, reply) = RateEntry::start(inquiry_id);
        tracing::debug!(identity = %identity, inquiry_id = %entry.inquiry_id, "guided rate entry started");
        session.rate_entry = Some(entry);
        session.touch();
        self.sessions.set(identity, session).await;
        Some(reply)
    }

    async fn continue_rate_entry(
        &self,
        identity: &Identity,
        mut session: Session,
        entry: RateEntry,
        text: &str,
    ) -> Option<Reply> {
        session.touch();
        match entry.advance(text) {
            RateProgress::Continue(entry, reply) => {
                session.rate_entry = Some(entry);
                self.sessions.set(identity, session).await;
                Some(reply)
            }
            RateProgress::Complete(quote) => {
                self.sessions.set(identity, session).await;
                self.dispatcher.submit_quote(identity, &quote).await
            }
        }
    }

    async fn advance_flow(
        &self,
        event: &InboundEvent,
        mut session: Session,
        text: &str,
    ) -> Option<Reply> {
        let identity = &event.identity;
        let step = std::mem::replace(&mut session.step, Step::Root);
        let Turn {
            reply,
            next,
            action,
        } = self.engine.advance(identity.platform, step, text).await;

        if matches!(next, Step::Completed) {
            self.sessions.delete(identity).await;
        } else {
            session.step = next;
            session.touch();
            self.sessions.set(identity, session).await;
        }

        if let Some(action) = action {
            let name = action.name();
            if let Err(e) = self
                .dispatcher
                .execute(identity, event.display_name.as_deref(), action)
                .await
            {
                tracing::error!(identity = %identity, action = name, error = %e, "completion action failed");
                self.sessions.delete(identity).await;
                return Some(Reply::text(SAVE_FAILED));
            }
            tracing::info!(identity = %identity, action = name, "completion action executed");
        }

        Some(reply)
    }
}
