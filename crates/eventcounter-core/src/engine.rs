//! The aggregation engine and its submission path.
//!
//! [`EventEngine`] owns the dedup store, the per-kind queues, the workers
//! and the counters. Transports call [`EventEngine::submit`] from any number
//! of tasks and [`EventEngine::begin_shutdown`] once at the end.
//!
//! # Admission
//!
//! Submission and the shutdown transition share a reader/writer gate.
//! `submit` holds the shared side only for the non-blocking admission step:
//! check the phase, check-and-set the message id, reserve an in-flight slot,
//! and clone the kind's sender. The coordinator takes the exclusive side to
//! flip the phase and drop the router. An admitted event therefore always
//! owns a live sender, and a closed engine never records the id of an event
//! it refused.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use eventcounter_types::{Event, EventKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::counter::CounterStore;
use crate::dedup::DedupStore;
use crate::error::EngineError;
use crate::router::EventRouter;
use crate::shutdown::Phase;
use crate::sink::ResultSink;
use crate::tracker::{InflightTracker, Reservation};
use crate::worker::spawn_kind_worker;

/// State guarded by the admission gate.
#[derive(Debug)]
pub(crate) struct Gate {
    pub(crate) phase: Phase,
    /// Present only while `phase` is [`Phase::Running`].
    pub(crate) router: Option<EventRouter>,
}

/// Deduplicating per-kind event counter.
pub struct EventEngine {
    pub(crate) gate: RwLock<Gate>,
    pub(crate) dedup: DedupStore,
    pub(crate) counters: Arc<CounterStore>,
    pub(crate) tracker: InflightTracker,
    pub(crate) workers: Mutex<Vec<(EventKind, JoinHandle<u64>)>>,
    pub(crate) sink: Arc<dyn ResultSink>,
}

impl EventEngine {
    /// Build the engine and start one worker per event kind.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `config` is unusable.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(config: EngineConfig, sink: Arc<dyn ResultSink>) -> Result<Self, EngineError> {
        config.validate()?;

        let counters = Arc::new(CounterStore::new());
        let tracker = InflightTracker::new();
        let (router, receivers) = EventRouter::new(config.queue_capacity);

        let workers = receivers
            .into_iter()
            .map(|(kind, queue)| {
                let handle =
                    spawn_kind_worker(kind, queue, Arc::clone(&counters), tracker.clone());
                (kind, handle)
            })
            .collect();

        info!(
            queue_capacity = config.queue_capacity,
            workers = EventKind::ALL.len(),
            "event engine started"
        );

        Ok(Self {
            gate: RwLock::new(Gate {
                phase: Phase::Running,
                router: Some(router),
            }),
            dedup: DedupStore::new(),
            counters,
            tracker,
            workers: Mutex::new(workers),
            sink,
        })
    }

    /// Submit one event for counting.
    ///
    /// Returns once the event is on its kind's queue, not once it is
    /// counted. Waits while that queue is full.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidMessageId`] if `message_id` is empty.
    /// - [`EngineError::DuplicateMessage`] if `message_id` was accepted before,
    ///   including after shutdown has begun.
    /// - [`EngineError::ServiceClosed`] once shutdown has begun, for an id
    ///   never accepted. Such an event is not counted.
    /// - [`EngineError::QueueUnavailable`] if the kind's worker is gone.
    pub async fn submit(
        &self,
        message_id: &str,
        user_id: &str,
        kind: EventKind,
    ) -> Result<(), EngineError> {
        if message_id.is_empty() {
            return Err(EngineError::InvalidMessageId);
        }

        let (queue, reservation) = self.admit(message_id, kind)?;
        let event = Event::new(message_id, user_id, kind);

        if queue.send(event).await.is_err() {
            // Receiver dropped: the worker is gone. Dropping the reservation
            // gives the slot back so the drain does not wait for this event.
            drop(reservation);
            warn!(
                kind = %kind,
                message_id = message_id,
                "kind queue closed unexpectedly, event not counted"
            );
            return Err(EngineError::QueueUnavailable { kind });
        }
        reservation.hand_off();

        debug!(
            kind = %kind,
            user_id = user_id,
            message_id = message_id,
            "event accepted"
        );
        Ok(())
    }

    /// Admission step, run under the shared side of the gate.
    fn admit(
        &self,
        message_id: &str,
        kind: EventKind,
    ) -> Result<(mpsc::Sender<Event>, Reservation), EngineError> {
        let gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        let Some(router) = gate.router.as_ref() else {
            // An id counted before the close is still a duplicate, not a refusal.
            if self.dedup.contains(message_id) {
                return Err(EngineError::DuplicateMessage {
                    message_id: message_id.to_owned(),
                });
            }
            return Err(EngineError::ServiceClosed);
        };
        if !self.dedup.accept_once(message_id) {
            return Err(EngineError::DuplicateMessage {
                message_id: message_id.to_owned(),
            });
        }
        let reservation = self.tracker.reserve();
        Ok((router.sender(kind).clone(), reservation))
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.gate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .phase
    }

    /// Number of distinct message ids accepted so far.
    pub fn accepted(&self) -> usize {
        self.dedup.len()
    }

    /// Number of accepted events not yet applied to the counters.
    pub fn in_flight(&self) -> u64 {
        self.tracker.in_flight()
    }

    /// Current count for `(kind, user_id)`.
    ///
    /// Only final after [`begin_shutdown`](Self::begin_shutdown) returns.
    pub fn count(&self, kind: EventKind, user_id: &str) -> u64 {
        self.counters.count(kind, user_id)
    }
}

impl std::fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEngine")
            .field("phase", &self.phase())
            .field("accepted", &self.accepted())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
