//! Command-line interface for stagehand.
//!
//! Provides commands for running the simulation lifecycle, probing the
//! environment, and inspecting or stopping containers.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
