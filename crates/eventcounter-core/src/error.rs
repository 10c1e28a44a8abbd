//! Error types for the aggregation engine.
//!
//! `submit` failures are expected, non-fatal outcomes the transport maps to
//! an acknowledgment decision. Only flush failures are meant to reach the
//! process as the overall result of shutdown.

use eventcounter_types::EventKind;

/// Errors surfaced by [`EventEngine`](crate::EventEngine).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The message identifier was empty.
    #[error("invalid message id: identifier is empty")]
    InvalidMessageId,

    /// The message identifier was already accepted once.
    #[error("duplicate message: {message_id}")]
    DuplicateMessage {
        /// The identifier that was seen before.
        message_id: String,
    },

    /// The engine has started draining and no longer admits events.
    #[error("service closed: engine is shutting down")]
    ServiceClosed,

    /// The worker for this kind is gone, so its queue cannot accept events.
    #[error("queue for {kind} events is unavailable")]
    QueueUnavailable {
        /// The kind whose queue rejected the event.
        kind: EventKind,
    },

    /// A kind worker terminated abnormally during the drain.
    #[error("worker for {kind} events failed: {reason}")]
    WorkerFailed {
        /// The kind the worker was bound to.
        kind: EventKind,
        /// Why the worker task ended.
        reason: String,
    },

    /// Serializing or persisting a kind's counts failed during flush.
    #[error("failed to write {kind} results: {reason}")]
    OutputWriteFailed {
        /// The kind whose artifact could not be written.
        kind: EventKind,
        /// The underlying sink failure.
        reason: String,
    },

    /// Shutdown was already requested by an earlier caller.
    #[error("shutdown already in progress")]
    ShutdownInProgress,

    /// The engine configuration is unusable.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}
