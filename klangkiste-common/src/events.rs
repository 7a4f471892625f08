//! Event types for the Klangkiste console event system
//!
//! Polling tasks publish observations here; views subscribe and re-derive
//! their state from fresh registry reads when an event arrives. Events carry
//! notification data only, never authoritative state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Console event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsoleEvent {
    /// A box's status feed surfaced a scan with a key not seen before
    ScanDetected {
        box_id: String,
        key: String,
        uid: String,
        known: bool,
        hardware_uid: String,
        at: i64,
        timestamp: DateTime<Utc>,
    },

    /// The global tag list was refreshed from the registry
    TagsRefreshed {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A box's assigned-tag list was refreshed
    BoxTagsRefreshed {
        box_id: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A box's local tag storage listing was refreshed
    LocalTagsRefreshed {
        box_id: String,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A block-matrix cell changed (after collaborator acknowledgement)
    BlockChanged {
        box_id: String,
        uid: String,
        blocked: bool,
        timestamp: DateTime<Utc>,
    },

    /// A tag finished the provisioning commit
    TagWritten {
        uid: String,
        bound: bool,
        timestamp: DateTime<Utc>,
    },

    /// A persisted wizard session was restored for a scan key
    SessionRestored {
        key: String,
        step: u8,
        timestamp: DateTime<Utc>,
    },

    /// A wizard session was cleared (completed or dismissed)
    SessionCleared {
        key: String,
        timestamp: DateTime<Utc>,
    },
}

impl ConsoleEvent {
    /// Event type name for logging and subscription filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ConsoleEvent::ScanDetected { .. } => "ScanDetected",
            ConsoleEvent::TagsRefreshed { .. } => "TagsRefreshed",
            ConsoleEvent::BoxTagsRefreshed { .. } => "BoxTagsRefreshed",
            ConsoleEvent::LocalTagsRefreshed { .. } => "LocalTagsRefreshed",
            ConsoleEvent::BlockChanged { .. } => "BlockChanged",
            ConsoleEvent::TagWritten { .. } => "TagWritten",
            ConsoleEvent::SessionRestored { .. } => "SessionRestored",
            ConsoleEvent::SessionCleared { .. } => "SessionCleared",
        }
    }
}

/// Broadcast event bus for console events
///
/// Subscribers receive events emitted after subscription; slow subscribers
/// lose the oldest buffered events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConsoleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers
    ///
    /// Returns the number of subscribers that received the event. Zero
    /// subscribers is not an error.
    pub fn emit(&self, event: ConsoleEvent) -> usize {
        tracing::trace!(event_type = event.event_type(), "emitting console event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Channel capacity configured at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_reach_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(ConsoleEvent::TagsRefreshed {
            count: 3,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.expect("event should be delivered");
        assert_eq!(event.event_type(), "TagsRefreshed");
    }

    #[test]
    fn emit_without_subscribers_reports_zero() {
        let bus = EventBus::new(4);
        let delivered = bus.emit(ConsoleEvent::SessionCleared {
            key: "k".to_string(),
            timestamp: Utc::now(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ConsoleEvent::TagWritten {
            uid: "ab12cd34ef".to_string(),
            bound: true,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).expect("serialization should succeed");
        assert!(json.contains("\"type\":\"TagWritten\""));
        assert!(json.contains("\"bound\":true"));
    }
}
