//! Simulation host integration.
//!
//! The vendor simulation runtime is opaque to this crate; everything we
//! rely on is captured by the [`SimulationHost`] trait. The production
//! implementation ([`process::ProcessHost`]) drives a host executable as a
//! child process; tests substitute scripted hosts.

use std::path::Path;

use async_trait::async_trait;

use crate::error::SimError;

pub mod process;
pub mod session;

pub use process::{HostConfig, ProcessHost};
pub use session::{SessionState, SimSession};

/// Contract with the simulation runtime.
///
/// Mirrors the host SDK surface this crate consumes: open a stage, start
/// timeline playback, advance updates, and shut down.
#[async_trait]
pub trait SimulationHost: Send {
    /// Open the scene file at `path` on the host's stage.
    async fn open_stage(&mut self, path: &Path) -> Result<(), SimError>;

    /// Start timeline playback.
    async fn play(&mut self) -> Result<(), SimError>;

    /// Advance one update. Returns `false` once the host has exited.
    async fn tick(&mut self) -> Result<bool, SimError>;

    /// Shut the host down. Implementations must tolerate repeated calls.
    async fn close(&mut self) -> Result<(), SimError>;
}
