//! Top-level run sequencer.
//!
//! Wires the pieces together for one run: probe the container engine, start
//! the simulation session, launch the sidecar container, arm the timeout
//! monitor, poll the update loop, then tear everything down in reverse
//! order. External failures are logged and non-fatal; the simulation keeps
//! running when the sidecar cannot start. The only aborting failure is a
//! session that cannot start at all.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::docker::DockerEngine;
use crate::lifecycle::{cancel_on_interrupt, RunFlag, TimeoutMonitor};
use crate::sim::SimSession;

/// Why the update loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The run flag was cleared by the timeout monitor or an interrupt.
    Cancelled,
    /// The simulation host went away on its own.
    HostExited,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::HostExited => write!(f, "host_exited"),
        }
    }
}

/// Outcome of one full lifecycle run.
#[derive(Debug)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub ticks: u64,
    pub stop_reason: StopReason,
    /// Name of the sidecar container, when it was launched.
    pub sidecar: Option<String>,
    /// Whether the sidecar was stopped at teardown.
    pub sidecar_stopped: bool,
}

/// Environment preflight results for the `check` command.
#[derive(Debug)]
pub struct PreflightReport {
    pub engine_version: Option<String>,
    /// Whether the sidecar image is present locally. `None` when there is no
    /// sidecar configured or the engine is unavailable.
    pub sidecar_image_present: Option<bool>,
    pub scene_exists: bool,
}

impl PreflightReport {
    /// Whether the environment can support a full run.
    pub fn ready(&self) -> bool {
        self.engine_version.is_some() && self.scene_exists
    }
}

/// Sequences one simulation run from startup to teardown.
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    /// Creates a runner for the given config.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// The runner's config.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the full lifecycle, stopping on timeout or ctrl-c.
    pub async fn run(&self, engine: &DockerEngine, session: &mut SimSession) -> Result<RunSummary> {
        let flag = RunFlag::new();
        let interrupt = cancel_on_interrupt(flag.clone());
        let result = self.run_with_flag(engine, session, flag).await;
        interrupt.abort();
        result
    }

    /// Run the full lifecycle against a caller-supplied run flag.
    pub async fn run_with_flag(
        &self,
        engine: &DockerEngine,
        session: &mut SimSession,
        flag: RunFlag,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        session
            .start(&self.config.scene)
            .await
            .context("failed to start simulation session")?;

        let sidecar = self.launch_sidecar(engine).await;

        let mut monitor = TimeoutMonitor::start(flag.clone(), self.config.timeout());

        let mut ticks = 0u64;
        let mut stop_reason = StopReason::Cancelled;
        while flag.is_running() {
            match session.tick().await {
                Ok(true) => ticks += 1,
                Ok(false) => {
                    stop_reason = StopReason::HostExited;
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Update tick failed, stopping run");
                    stop_reason = StopReason::HostExited;
                    break;
                }
            }
        }
        monitor.stop();

        // Teardown reverses startup: sidecar first, then the session.
        let sidecar_stopped = match &sidecar {
            Some(name) => match engine.stop_container(name).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(container = %name, error = %e, "Failed to stop sidecar container");
                    false
                }
            },
            None => false,
        };

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close simulation session");
        }

        let summary = RunSummary {
            elapsed: started.elapsed(),
            ticks,
            stop_reason,
            sidecar,
            sidecar_stopped,
        };
        info!(
            elapsed_secs = summary.elapsed.as_secs(),
            ticks = summary.ticks,
            stop_reason = %summary.stop_reason,
            sidecar = summary.sidecar.as_deref().unwrap_or("none"),
            "Run complete"
        );
        Ok(summary)
    }

    /// Launch the configured sidecar container, if any.
    ///
    /// Returns the container name on success. Every failure is logged and
    /// swallowed; the simulation runs on without the sidecar.
    async fn launch_sidecar(&self, engine: &DockerEngine) -> Option<String> {
        let sidecar = self.config.sidecar.as_ref()?;

        let opts = match sidecar.to_run_options() {
            Ok(opts) => opts,
            Err(e) => {
                warn!(error = %e, "Invalid sidecar config, continuing without sidecar");
                return None;
            }
        };

        match engine.run_container(&sidecar.image, &opts).await {
            Ok(out) if out.success() => {
                info!(
                    container = %sidecar.name,
                    image = %sidecar.image,
                    "Sidecar container started"
                );
                Some(sidecar.name.clone())
            }
            Ok(out) => {
                warn!(
                    image = %sidecar.image,
                    exit_code = out.exit_code,
                    stderr = %out.stderr.trim(),
                    "Sidecar launch failed, continuing without sidecar"
                );
                None
            }
            Err(e) => {
                warn!(
                    image = %sidecar.image,
                    error = %e,
                    "Sidecar launch failed, continuing without sidecar"
                );
                None
            }
        }
    }

    /// Probe the environment without starting anything.
    pub async fn preflight(&self, engine: &DockerEngine) -> PreflightReport {
        let sidecar_image_present = match (&self.config.sidecar, engine.is_available()) {
            (Some(sidecar), true) => match engine.image_exists(&sidecar.image).await {
                Ok(present) => Some(present),
                Err(e) => {
                    warn!(image = %sidecar.image, error = %e, "Image check failed");
                    None
                }
            },
            _ => None,
        };

        PreflightReport {
            engine_version: engine.version().map(str::to_string),
            sidecar_image_present,
            scene_exists: self.config.scene.exists(),
        }
    }
}
