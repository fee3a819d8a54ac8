//! Error types for stagehand operations.
//!
//! Defines error types for the major subsystems:
//! - Container engine CLI invocations
//! - Simulation host control
//! - Configuration loading

use thiserror::Error;

/// Errors that can occur while driving the container-engine CLI.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Container engine not available: {0}")]
    Unavailable(String),

    #[error("Command timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Failed to pull image '{image}': {stderr}")]
    PullFailed { image: String, stderr: String },

    #[error("Failed to stop container '{id}': {stderr}")]
    StopFailed { id: String, stderr: String },

    #[error("Failed to list containers: {0}")]
    ListFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while controlling the simulation host.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Failed to launch simulation host '{command}': {reason}")]
    HostLaunch { command: String, reason: String },

    #[error("Session is already running")]
    AlreadyRunning,

    #[error("Session has not been started")]
    NotStarted,

    #[error("Session is closed")]
    SessionClosed,

    #[error("Lost contact with simulation host: {0}")]
    ControlChannel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
