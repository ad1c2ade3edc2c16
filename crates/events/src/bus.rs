//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`StateEvent`]s. It is
//! owned by the Kibi state and shared with observers through
//! [`EventBus::subscribe`].

use kibi_core::time::PersistedTime;
use kibi_core::Query;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// StateEvent
// ---------------------------------------------------------------------------

/// A change observers of the Kibi state can react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateEvent {
    /// The stored time of a dashboard other than the open one changed.
    Time {
        dashboard_id: String,
        new_time: Option<PersistedTime>,
        old_time: Option<PersistedTime>,
    },

    /// These dashboards were restored to their saved definitions.
    Reset { dashboard_ids: Vec<String> },

    /// The query of the live application state was reset and must be
    /// pushed to the search source.
    ResetAppStateQuery { query: Query },
}

impl StateEvent {
    /// The event name, e.g. `"reset_app_state_query"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Time { .. } => "time",
            Self::Reset { .. } => "reset",
            Self::ResetAppStateQuery { .. } => "reset_app_state_query",
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use kibi_events::bus::{EventBus, StateEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(StateEvent::Reset { dashboard_ids: vec!["dash".into()] });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<StateEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: StateEvent) {
        tracing::debug!(event = event.name(), "Kibi state event");
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
