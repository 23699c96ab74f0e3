//! Application Layer
//!
//! Composition root: builds the pipeline from config and injected ports.

pub mod orchestrator;

pub use orchestrator::{EngineSubscriber, Orchestrator, OrchestratorError};
