//! Observer event types

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error_state::ErrorState;

/// Severity of a transient notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Events emitted while the solution state changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolutionEvent {
    /// Items were added, replaced, removed or re-selected
    HistoryChanged { len: usize, active: usize },

    /// The open round of an item received text
    RoundUpdated { item_id: Uuid, round: usize },

    /// The view should follow the newest text
    ScrollToEnd,

    /// Loading flag flipped
    LoadingChanged { loading: bool },

    /// Thinking phase started or ended
    ThinkingChanged {
        thinking: bool,
        duration_secs: f64,
    },

    /// The error overlay changed
    ErrorChanged { state: ErrorState },

    /// A transient toast
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

impl SolutionEvent {
    pub fn notify(level: NotificationLevel, message: impl Into<String>) -> Self {
        SolutionEvent::Notification {
            level,
            message: message.into(),
        }
    }
}

const EVENT_CAPACITY: usize = 256;

/// Broadcast fan-out for [`SolutionEvent`]s.
///
/// Sending never blocks and succeeds with no subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SolutionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SolutionEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SolutionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.emit(SolutionEvent::notify(level, message));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
