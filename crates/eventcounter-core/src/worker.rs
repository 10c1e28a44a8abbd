//! Per-kind worker tasks.
//!
//! Exactly one worker consumes each kind's queue, so increments for a kind
//! are applied in arrival order by a single writer. A worker exits when its
//! queue is closed and empty.

use std::sync::Arc;

use eventcounter_types::{Event, EventKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::counter::CounterStore;
use crate::tracker::InflightTracker;

/// Spawn the worker for `kind`.
///
/// The task resolves to the number of events it applied.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn_kind_worker(
    kind: EventKind,
    mut queue: mpsc::Receiver<Event>,
    counters: Arc<CounterStore>,
    tracker: InflightTracker,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut applied: u64 = 0;
        while let Some(event) = queue.recv().await {
            counters.increment(kind, &event.user_id);
            tracker.complete();
            applied = applied.saturating_add(1);
            debug!(
                kind = %kind,
                user_id = event.user_id,
                message_id = event.message_id,
                "event processed"
            );
        }
        debug!(kind = %kind, applied = applied, "queue closed and drained, worker exiting");
        applied
    })
}
