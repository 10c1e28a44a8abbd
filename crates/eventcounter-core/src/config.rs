//! Engine configuration.

use serde::Deserialize;

use crate::error::EngineError;

/// Default capacity of each per-kind queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Tunables for [`EventEngine`](crate::EventEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Number of events each kind's queue holds before `submit` waits for
    /// the worker to catch up.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `queue_capacity` is zero.
    pub fn validate(self) -> Result<(), EngineError> {
        if self.queue_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "queue_capacity must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}
