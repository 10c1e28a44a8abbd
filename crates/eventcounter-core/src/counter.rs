//! Concurrent per-kind, per-user counters.
//!
//! The store is partitioned by [`EventKind`]: each kind has its own map, and
//! only the worker bound to that kind ever writes into it. Cells are created
//! lazily on first increment and never removed. Each cell is an atomic, so a
//! second writer for the same kind would still be safe.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use eventcounter_types::EventKind;
use tracing::warn;

/// Final counts: kind -> user -> count.
pub type CountSnapshot = BTreeMap<EventKind, BTreeMap<String, u64>>;

/// Running counts keyed by (kind, user).
#[derive(Debug, Default)]
pub struct CounterStore {
    created: DashMap<String, AtomicU64>,
    updated: DashMap<String, AtomicU64>,
    deleted: DashMap<String, AtomicU64>,
}

impl CounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    const fn partition(&self, kind: EventKind) -> &DashMap<String, AtomicU64> {
        match kind {
            EventKind::Created => &self.created,
            EventKind::Updated => &self.updated,
            EventKind::Deleted => &self.deleted,
        }
    }

    /// Add one to the `(kind, user_id)` cell, creating it if needed.
    pub fn increment(&self, kind: EventKind, user_id: &str) {
        let partition = self.partition(kind);
        // Existing cells only need the shard read lock.
        let applied = match partition.get(user_id) {
            Some(cell) => bump(&cell),
            None => bump(&partition.entry(user_id.to_owned()).or_default()),
        };
        if !applied {
            warn!(kind = %kind, user_id = user_id, "counter saturated, increment dropped");
        }
    }

    /// Current count for `(kind, user_id)`, zero if never incremented.
    pub fn count(&self, kind: EventKind, user_id: &str) -> u64 {
        self.partition(kind)
            .get(user_id)
            .map_or(0, |cell| cell.load(Ordering::Acquire))
    }

    /// Sum of every cell across all kinds.
    pub fn total(&self) -> u64 {
        EventKind::ALL
            .iter()
            .map(|kind| {
                self.partition(*kind)
                    .iter()
                    .map(|cell| cell.value().load(Ordering::Acquire))
                    .fold(0_u64, u64::saturating_add)
            })
            .fold(0_u64, u64::saturating_add)
    }

    /// Copy every count into plain maps.
    ///
    /// The copy is only consistent once all writers have stopped; the
    /// shutdown coordinator calls it after every worker has exited.
    pub fn snapshot(&self) -> CountSnapshot {
        EventKind::ALL
            .iter()
            .map(|kind| {
                let users = self
                    .partition(*kind)
                    .iter()
                    .map(|cell| (cell.key().clone(), cell.value().load(Ordering::Acquire)))
                    .collect();
                (*kind, users)
            })
            .collect()
    }
}

/// Add one to `cell`, leaving it at `u64::MAX` once saturated.
///
/// Returns `false` if the cell was already saturated.
fn bump(cell: &AtomicU64) -> bool {
    cell.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
        .is_ok()
}
