//! Shared type definitions for the event counter.
//!
//! This crate holds the vocabulary shared by the aggregation engine and the
//! transport that feeds it. It has no runtime behavior of its own.
//!
//! # Modules
//!
//! - [`enums`] -- The closed [`EventKind`] enumeration and its wire parsing
//! - [`event`] -- The transient [`Event`] carried from submission to a worker

pub mod enums;
pub mod event;

// Re-export all public types at crate root for convenience.
pub use enums::{EventKind, ParseEventKindError};
pub use event::Event;
