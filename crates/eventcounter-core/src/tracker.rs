//! In-flight event tracking.
//!
//! Every admitted event is reserved here before it is enqueued and released
//! by its worker after the increment has been applied. The count lives in a
//! `watch` channel so the coordinator can wait for zero without polling:
//! `wait_for` checks the current value and every later update under the same
//! lock, which leaves no window for a missed wakeup.
//!
//! A reservation is an RAII [`Reservation`]: if the submitting task is
//! cancelled or its send fails before the event reaches a queue, dropping the
//! reservation releases the slot, so the drain never waits for an event that
//! will not arrive.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared count of admitted-but-not-yet-applied events.
#[derive(Debug, Clone)]
pub struct InflightTracker {
    count: Arc<watch::Sender<u64>>,
}

impl Default for InflightTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InflightTracker {
    /// Create a tracker at zero.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0_u64);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Reserve a slot for an event about to be enqueued.
    pub fn reserve(&self) -> Reservation {
        self.count.send_modify(|n| *n = n.saturating_add(1));
        Reservation {
            tracker: self.clone(),
            armed: true,
        }
    }

    /// Release the slot of an event that was applied or abandoned.
    pub fn complete(&self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Current number of in-flight events.
    pub fn in_flight(&self) -> u64 {
        *self.count.borrow()
    }

    /// Wait until the in-flight count reaches zero.
    ///
    /// Returns immediately if nothing is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// A reserved in-flight slot that has not yet reached a queue.
#[must_use = "dropping a reservation releases the slot immediately"]
#[derive(Debug)]
pub struct Reservation {
    tracker: InflightTracker,
    armed: bool,
}

impl Reservation {
    /// The event is on its queue; the worker now owns the slot and will
    /// release it with [`InflightTracker::complete`].
    pub fn hand_off(mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            self.tracker.complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn reserve_and_complete_balance() {
        let tracker = InflightTracker::new();
        tracker.reserve().hand_off();
        tracker.reserve().hand_off();
        assert_eq!(tracker.in_flight(), 2);
        tracker.complete();
        tracker.complete();
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn complete_never_underflows() {
        let tracker = InflightTracker::new();
        tracker.complete();
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn dropped_reservation_releases_its_slot() {
        let tracker = InflightTracker::new();
        let reservation = tracker.reserve();
        assert_eq!(tracker.in_flight(), 1);
        drop(reservation);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_at_zero() {
        let tracker = InflightTracker::new();
        let waited = tokio::time::timeout(Duration::from_secs(1), tracker.wait_idle()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn wait_idle_wakes_when_last_slot_completes() {
        let tracker = InflightTracker::new();
        tracker.reserve().hand_off();
        tracker.reserve().hand_off();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tracker.complete();
        tracker.complete();
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
