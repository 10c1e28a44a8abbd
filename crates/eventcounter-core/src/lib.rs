//! In-process event aggregation engine.
//!
//! The engine turns an at-least-once stream of classified events into
//! per-kind, per-user counts where every distinct message is counted at most
//! once, and writes those counts out when the process shuts down.
//!
//! # Architecture
//!
//! ```text
//! submit --> gate --> DedupStore --> EventRouter --(per kind)--> KindWorker --> CounterStore
//!                                                                                   |
//! begin_shutdown --> close queues --> wait for in-flight == 0 --> snapshot --> ResultSink
//! ```
//!
//! # Modules
//!
//! - [`dedup`] -- [`DedupStore`]: check-and-set over accepted message ids.
//! - [`router`] -- [`EventRouter`]: one bounded queue per event kind.
//! - [`worker`] -- The per-kind worker task applying increments.
//! - [`counter`] -- [`CounterStore`]: concurrent (kind, user) counters.
//! - [`tracker`] -- [`InflightTracker`]: admitted-but-unapplied event count.
//! - [`engine`] -- [`EventEngine`]: construction and `submit`.
//! - [`shutdown`] -- Drain-then-flush coordinator and its [`Phase`] machine.
//! - [`sink`] -- [`ResultSink`] output collaborator and its JSON file form.
//! - [`consumer`] -- [`EventConsumer`] seam used by transports.
//! - [`config`] -- [`EngineConfig`].
//! - [`error`] -- [`EngineError`].

pub mod config;
pub mod consumer;
pub mod counter;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod router;
pub mod shutdown;
pub mod sink;
pub mod tracker;
pub mod worker;

// Re-export primary types at crate root.
pub use config::EngineConfig;
pub use consumer::{EventConsumer, LoggingConsumer};
pub use counter::{CountSnapshot, CounterStore};
pub use dedup::DedupStore;
pub use engine::EventEngine;
pub use error::EngineError;
pub use router::EventRouter;
pub use shutdown::Phase;
pub use sink::{JsonFileSink, MemorySink, ResultSink, SinkError};
pub use tracker::{InflightTracker, Reservation};
