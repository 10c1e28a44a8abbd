//! The event carried between submission and the kind worker.

use serde::{Deserialize, Serialize};

use crate::enums::EventKind;

/// A classified domain event.
///
/// Events are transient: they live only between a successful submit and the
/// moment a worker applies them to the counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique token per logical event, used to suppress redelivery.
    pub message_id: String,
    /// The user the event is attributed to.
    pub user_id: String,
    /// The category of the event.
    pub kind: EventKind,
}

impl Event {
    /// Build an event from borrowed parts.
    pub fn new(message_id: &str, user_id: &str, kind: EventKind) -> Self {
        Self {
            message_id: message_id.to_owned(),
            user_id: user_id.to_owned(),
            kind,
        }
    }
}
