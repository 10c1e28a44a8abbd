//! Per-kind bounded work queues.
//!
//! The router decouples submitting callers from the workers that apply
//! increments. Each kind gets its own bounded channel; a full channel makes
//! `send` wait, which is the backpressure signal the transport relies on.
//! Dropping the router drops its senders, which closes the queues once every
//! outstanding sender clone has finished its send.

use eventcounter_types::{Event, EventKind};
use tokio::sync::mpsc;

/// Sending halves of the per-kind queues.
#[derive(Debug)]
pub struct EventRouter {
    created: mpsc::Sender<Event>,
    updated: mpsc::Sender<Event>,
    deleted: mpsc::Sender<Event>,
}

/// Receiving half of one kind's queue, handed to that kind's worker.
pub type KindReceiver = (EventKind, mpsc::Receiver<Event>);

impl EventRouter {
    /// Create one queue of `capacity` per kind.
    ///
    /// `capacity` must be non-zero; [`EngineConfig::validate`] enforces it.
    ///
    /// [`EngineConfig::validate`]: crate::EngineConfig::validate
    pub fn new(capacity: usize) -> (Self, [KindReceiver; 3]) {
        let (created, created_rx) = mpsc::channel(capacity);
        let (updated, updated_rx) = mpsc::channel(capacity);
        let (deleted, deleted_rx) = mpsc::channel(capacity);
        let router = Self {
            created,
            updated,
            deleted,
        };
        let receivers = [
            (EventKind::Created, created_rx),
            (EventKind::Updated, updated_rx),
            (EventKind::Deleted, deleted_rx),
        ];
        (router, receivers)
    }

    /// The queue events of `kind` are sent to.
    pub const fn sender(&self, kind: EventKind) -> &mpsc::Sender<Event> {
        match kind {
            EventKind::Created => &self.created,
            EventKind::Updated => &self.updated,
            EventKind::Deleted => &self.deleted,
        }
    }
}
