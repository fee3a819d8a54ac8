//! Simulation session lifecycle.
//!
//! Wraps a [`SimulationHost`] with an explicit idle/running/closed
//! lifecycle: scene loading with a missing-file fallback, playback start,
//! guarded update ticks, and idempotent shutdown.

use std::path::Path;

use tracing::{info, warn};

use crate::error::SimError;
use crate::sim::SimulationHost;

/// Lifecycle state of a [`SimSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Closed,
}

/// A simulation run over one host instance.
///
/// The session owns the host handle; once closed, the handle is never
/// touched again and every further operation except [`SimSession::close`]
/// reports [`SimError::SessionClosed`].
pub struct SimSession {
    host: Box<dyn SimulationHost>,
    state: SessionState,
}

impl SimSession {
    /// Wrap a freshly constructed host.
    pub fn new(host: Box<dyn SimulationHost>) -> Self {
        Self {
            host,
            state: SessionState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Load the scene and start playback.
    ///
    /// A missing scene file is not fatal: the host keeps its empty stage
    /// and playback starts anyway.
    pub async fn start(&mut self, scene: &Path) -> Result<(), SimError> {
        match self.state {
            SessionState::Running => return Err(SimError::AlreadyRunning),
            SessionState::Closed => return Err(SimError::SessionClosed),
            SessionState::Idle => {}
        }

        if scene.exists() {
            self.host.open_stage(scene).await?;
        } else {
            warn!(
                scene = %scene.display(),
                "Scene file not found, continuing with an empty stage"
            );
        }

        self.host.play().await?;
        self.state = SessionState::Running;
        info!(scene = %scene.display(), "Simulation session running");
        Ok(())
    }

    /// Advance one update. Returns `false` once the host has exited.
    pub async fn tick(&mut self) -> Result<bool, SimError> {
        match self.state {
            SessionState::Running => self.host.tick().await,
            SessionState::Idle => Err(SimError::NotStarted),
            SessionState::Closed => Err(SimError::SessionClosed),
        }
    }

    /// Shut the session down.
    ///
    /// Idempotent: the first call releases the host, later calls are no-ops.
    pub async fn close(&mut self) -> Result<(), SimError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.host.close().await?;
        self.state = SessionState::Closed;
        info!("Simulation session closed");
        Ok(())
    }
}
