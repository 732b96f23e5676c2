//! Shared test utilities for jobtrack integration tests.
//!
//! - `TestHarness` wires a pipeline, a SQLite primary store and a CSV
//!   fallback inside a temp directory
//! - `MessageBuilder` creates raw messages without boilerplate

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FailingStore, ScriptedBackend, TestHarness, VecSource};
