//! Execution adapters

pub mod paper;

pub use paper::PaperExecutor;
