//! CLI Adapter
//!
//! Command-line interface for the mirrorbot pipeline.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{execute, CliApp, Command, RunCmd, ValidateCmd};
