//! Event consumption loop: delivery to consumer to disposition.
//!
//! The loop pulls deliveries until one of three things happens:
//! 1. a shutdown signal arrives,
//! 2. no delivery arrives within the idle timeout,
//! 3. the subscription ends.
//!
//! Each delivery is decoded, handed to an [`EventConsumer`], and resolved to
//! a [`Disposition`]. Core NATS has no acknowledgments, so the disposition is
//! only logged; a broker with acks would act on it here.

use std::future::Future;
use std::time::Duration;

use eventcounter_core::{EngineError, EventConsumer};
use futures::{Stream, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::nats::{decode_payload, parse_subject, Delivery};

/// What the broker should do with a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Handled; do not deliver again.
    Ack,
    /// Unprocessable; drop without redelivery.
    Reject,
    /// Not handled now; deliver again later.
    Requeue,
}

/// Why the consumption loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT or SIGTERM.
    Signal,
    /// No delivery within the idle timeout.
    Idle,
    /// The delivery stream ended.
    SubscriptionClosed,
}

/// Per-disposition tallies for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Deliveries acknowledged.
    pub acked: u64,
    /// Deliveries rejected.
    pub rejected: u64,
    /// Deliveries handed back for redelivery.
    pub requeued: u64,
}

impl RunStats {
    fn record(&mut self, disposition: Disposition) {
        let slot = match disposition {
            Disposition::Ack => &mut self.acked,
            Disposition::Reject => &mut self.rejected,
            Disposition::Requeue => &mut self.requeued,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Drives deliveries into an [`EventConsumer`].
#[derive(Debug, Clone, Copy)]
pub struct EventRunner {
    idle_timeout: Duration,
}

impl EventRunner {
    /// Create a runner that stops after `idle_timeout` without deliveries.
    pub const fn new(idle_timeout: Duration) -> Self {
        Self { idle_timeout }
    }

    /// Consume `deliveries` until a stop condition is met.
    pub async fn run<C, S, F>(
        &self,
        consumer: &C,
        mut deliveries: S,
        shutdown: F,
    ) -> (StopReason, RunStats)
    where
        C: EventConsumer,
        S: Stream<Item = Delivery> + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = RunStats::default();
        info!(
            idle_timeout_ms = self.idle_timeout.as_millis(),
            "event runner started, awaiting deliveries"
        );

        let reason = loop {
            let next = tokio::select! {
                () = &mut shutdown => break StopReason::Signal,
                next = timeout(self.idle_timeout, deliveries.next()) => next,
            };

            match next {
                Ok(Some(delivery)) => {
                    let disposition = handle_delivery(consumer, &delivery).await;
                    stats.record(disposition);
                }
                Ok(None) => break StopReason::SubscriptionClosed,
                Err(_elapsed) => break StopReason::Idle,
            }
        };

        info!(
            reason = ?reason,
            acked = stats.acked,
            rejected = stats.rejected,
            requeued = stats.requeued,
            "event runner stopped"
        );
        (reason, stats)
    }
}

/// Decode one delivery, submit it, and decide its disposition.
pub async fn handle_delivery<C: EventConsumer>(consumer: &C, delivery: &Delivery) -> Disposition {
    let (user_id, kind) = match parse_subject(&delivery.subject) {
        Ok(route) => route,
        Err(e) => {
            warn!(subject = delivery.subject, error = %e, "rejecting delivery");
            return Disposition::Reject;
        }
    };
    let payload = match decode_payload(&delivery.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(subject = delivery.subject, error = %e, "rejecting delivery");
            return Disposition::Reject;
        }
    };

    match consumer.submit(&payload.id, &user_id, kind).await {
        Ok(()) => Disposition::Ack,
        Err(EngineError::DuplicateMessage { message_id }) => {
            debug!(message_id = message_id, "duplicate delivery acknowledged");
            Disposition::Ack
        }
        Err(EngineError::InvalidMessageId) => {
            warn!(subject = delivery.subject, "rejecting delivery with empty message id");
            Disposition::Reject
        }
        Err(e @ EngineError::QueueUnavailable { .. }) => {
            // The id is already recorded, so a redelivery would only be acked
            // as a duplicate. Redelivery cannot recover this event.
            warn!(
                subject = delivery.subject,
                message_id = payload.id,
                error = %e,
                "rejecting delivery, event lost with its worker"
            );
            Disposition::Reject
        }
        Err(e @ EngineError::ServiceClosed) => {
            info!(
                subject = delivery.subject,
                message_id = payload.id,
                error = %e,
                "requeueing delivery"
            );
            Disposition::Requeue
        }
        Err(e) => {
            warn!(
                subject = delivery.subject,
                message_id = payload.id,
                error = %e,
                "unexpected engine error, requeueing delivery"
            );
            Disposition::Requeue
        }
    }
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
///
/// A handler that cannot be installed never resolves, leaving the other
/// stop conditions in charge.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("SIGINT received"),
        () = terminate => info!("SIGTERM received"),
    }
}
