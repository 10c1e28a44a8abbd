//! Drain-then-flush shutdown coordination.
//!
//! The engine moves through three phases:
//!
//! ```text
//! Running --begin_shutdown--> Draining --all outputs attempted--> Flushed
//! ```
//!
//! Draining closes every kind queue, waits for each worker to empty its
//! queue and exit, and waits for the in-flight tracker to reach zero. Only
//! then are the counters read, so the snapshot contains every event whose
//! `submit` returned `Ok`.
//!
//! Flushing hands each non-empty kind to the sink. Every kind is attempted;
//! the first failure is returned after the others have been tried.

use std::mem;
use std::sync::PoisonError;

use tracing::{debug, error, info, warn};

use crate::counter::CountSnapshot;
use crate::engine::EventEngine;
use crate::error::EngineError;
use crate::sink::ResultSink;

/// Lifecycle phase of an [`EventEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Admitting events.
    Running,
    /// Refusing events and waiting for admitted ones to be applied.
    Draining,
    /// Counts have been handed to the sink. Terminal.
    Flushed,
}

impl EventEngine {
    /// Stop admitting events, drain everything admitted, and flush counts.
    ///
    /// Blocks until every accepted event has been counted and every
    /// non-empty kind has been offered to the sink. The engine ends in
    /// [`Phase::Flushed`] whether or not the outputs succeeded.
    ///
    /// # Errors
    ///
    /// - [`EngineError::ShutdownInProgress`] if shutdown was already requested.
    /// - [`EngineError::WorkerFailed`] if a kind worker ended abnormally.
    /// - [`EngineError::OutputWriteFailed`] for the first kind the sink
    ///   could not write.
    pub async fn begin_shutdown(&self) -> Result<(), EngineError> {
        {
            let mut gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
            if gate.phase != Phase::Running {
                return Err(EngineError::ShutdownInProgress);
            }
            gate.phase = Phase::Draining;
            // Dropping the router closes the queues once in-flight sends finish.
            drop(gate.router.take());
        }
        info!(
            accepted = self.accepted(),
            in_flight = self.tracker.in_flight(),
            "draining event queues"
        );

        let mut first_error = self.join_workers().await;
        if first_error.is_none() {
            self.tracker.wait_idle().await;
        } else {
            warn!(
                in_flight = self.tracker.in_flight(),
                "skipping in-flight wait after worker failure, counts may be partial"
            );
        }

        let snapshot = self.counters.snapshot();
        info!(total = self.counters.total(), "queues drained, flushing results");

        let flushed = flush(self.sink.as_ref(), &snapshot);
        if let Err(e) = flushed {
            first_error.get_or_insert(e);
        }

        self.gate
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = Phase::Flushed;

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("shutdown complete");
                Ok(())
            }
        }
    }

    /// Wait for every worker to exit, returning the first failure.
    async fn join_workers(&self) -> Option<EngineError> {
        let workers = mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        let mut first_error = None;
        for (kind, handle) in workers {
            match handle.await {
                Ok(applied) => debug!(kind = %kind, applied = applied, "worker joined"),
                Err(e) => {
                    error!(kind = %kind, error = %e, "worker ended abnormally");
                    first_error.get_or_insert(EngineError::WorkerFailed {
                        kind,
                        reason: e.to_string(),
                    });
                }
            }
        }
        first_error
    }
}

/// Offer every non-empty kind in `snapshot` to `sink`.
///
/// Kinds with no users are skipped. A failing kind does not stop the
/// remaining ones.
///
/// # Errors
///
/// Returns [`EngineError::OutputWriteFailed`] for the first kind that failed.
pub fn flush(sink: &dyn ResultSink, snapshot: &CountSnapshot) -> Result<(), EngineError> {
    let mut first_error = None;

    for (kind, counts) in snapshot {
        if counts.is_empty() {
            debug!(kind = %kind, "no events recorded, skipping artifact");
            continue;
        }
        if let Err(e) = sink.write(*kind, counts) {
            error!(kind = %kind, error = %e, "failed to write results");
            first_error.get_or_insert(EngineError::OutputWriteFailed {
                kind: *kind,
                reason: e.to_string(),
            });
        }
    }

    first_error.map_or(Ok(()), Err)
}
