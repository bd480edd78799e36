//! Client event system
//!
//! The EventBus decouples mutations from whoever reacts to them. The
//! dispatcher publishes invalidations and notices; list controllers, toasts
//! and session handling subscribe.
//!
//! # Architecture
//!
//! ```text
//! MutationDispatcher ──┐                                   ──▶ ListController refresh loop
//!                      ├──▶ EventBus::publish() ──▶ broadcast ──▶ toast presenter
//! ApiClient (401) ─────┘                                   ──▶ session teardown
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = EventBus::new(1024);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(ClientEvent::Notice(Notice::success("Expense added")));
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("{:?}", envelope.event);
//! }
//! ```

use crate::core::cache::QueryKey;
use crate::core::error::Notice;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events published by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Cached data for `key` is stale and must be re-read
    Invalidated { key: QueryKey },
    /// A transient message for the user
    Notice(Notice),
    /// The API answered 401; the token has been cleared
    SessionExpired,
}

impl ClientEvent {
    pub fn event_kind(&self) -> &str {
        match self {
            ClientEvent::Invalidated { .. } => "invalidated",
            ClientEvent::Notice(_) => "notice",
            ClientEvent::SessionExpired => "session_expired",
        }
    }

    /// The query key this event invalidates, if any
    pub fn invalidated_key(&self) -> Option<QueryKey> {
        match self {
            ClientEvent::Invalidated { key } => Some(*key),
            _ => None,
        }
    }
}

/// Envelope wrapping a client event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: ClientEvent,
}

impl EventEnvelope {
    pub fn new(event: ClientEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone; every clone publishes to the same subscribers. Slow
/// receivers get `Lagged` on their next `recv()` once `capacity` events are
/// buffered.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers that will see the event.
    pub fn publish(&self, event: ClientEvent) -> usize {
        tracing::trace!(kind = event.event_kind(), "publishing client event");
        // send() only errs without receivers
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Shorthand for publishing a notice
    pub fn notify(&self, notice: Notice) -> usize {
        self.publish(ClientEvent::Notice(notice))
    }

    /// Receive all events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
