//! Orchestration loop and its events.

pub mod events;
pub mod runner;

pub use events::LoopEvent;
pub use runner::{LoopEventSink, LoopLimits, Orchestrator};
