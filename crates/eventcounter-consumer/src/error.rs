//! Error types for the event consumer.
//!
//! Transport failures (NATS, configuration) are fatal at startup. Delivery
//! failures (subject, payload, kind) only ever reject a single message.

use eventcounter_core::EngineError;
use eventcounter_types::ParseEventKindError;

/// Errors that can occur while consuming events.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The subject does not follow `<user_id>.event.<kind>`.
    #[error("unroutable subject: {0}")]
    InvalidSubject(String),

    /// The payload is not a JSON object with an `id` field.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The subject names an event kind that does not exist.
    #[error(transparent)]
    Kind(#[from] ParseEventKindError),

    /// The engine refused to start or failed to shut down cleanly.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
