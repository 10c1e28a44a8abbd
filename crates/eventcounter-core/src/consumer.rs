//! The seam between a transport and whatever handles its events.
//!
//! A transport decodes a delivery into `(message_id, user_id, kind)` and
//! hands it to an [`EventConsumer`]. The counting engine is one consumer;
//! [`LoggingConsumer`] is another that only records what it saw, for dry
//! runs against a live broker.

use std::future::Future;

use eventcounter_types::EventKind;
use tracing::info;

use crate::engine::EventEngine;
use crate::error::EngineError;

/// Receives decoded events from a transport.
pub trait EventConsumer: Send + Sync {
    /// Handle one event.
    ///
    /// # Errors
    ///
    /// Implementations return [`EngineError`] so transports can map the
    /// outcome onto a broker disposition the same way for every consumer.
    fn submit(
        &self,
        message_id: &str,
        user_id: &str,
        kind: EventKind,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

impl EventConsumer for EventEngine {
    fn submit(
        &self,
        message_id: &str,
        user_id: &str,
        kind: EventKind,
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        // Resolves to the inherent method.
        Self::submit(self, message_id, user_id, kind)
    }
}

/// Logs every event and counts nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConsumer;

impl LoggingConsumer {
    /// Create a logging consumer.
    pub const fn new() -> Self {
        Self
    }
}

impl EventConsumer for LoggingConsumer {
    async fn submit(
        &self,
        message_id: &str,
        user_id: &str,
        kind: EventKind,
    ) -> Result<(), EngineError> {
        info!(
            kind = %kind,
            user_id = user_id,
            message_id = message_id,
            "event processed"
        );
        Ok(())
    }
}
