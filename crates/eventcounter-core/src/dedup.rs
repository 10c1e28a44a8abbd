//! Deduplication of message identifiers.
//!
//! The store is the gate that turns at-least-once delivery into
//! at-most-one-count semantics. It is the one structure written by every
//! submitting caller, so it is a sharded concurrent set: callers contend
//! only when their identifiers land in the same shard.
//!
//! Identifiers are never evicted. The set lives as long as the process.

use dashmap::DashSet;

/// Set of message identifiers that have been accepted.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: DashSet<String>,
}

impl DedupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message_id` and report whether this call was the first.
    ///
    /// Returns `true` exactly once per distinct identifier. Concurrent calls
    /// with the same identifier yield a single `true`.
    pub fn accept_once(&self, message_id: &str) -> bool {
        if self.seen.contains(message_id) {
            return false;
        }
        self.seen.insert(message_id.to_owned())
    }

    /// Whether `message_id` has been accepted, without recording it.
    pub fn contains(&self, message_id: &str) -> bool {
        self.seen.contains(message_id)
    }

    /// Number of identifiers accepted so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no identifier has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
