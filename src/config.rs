//! Runner configuration.
//!
//! Defaults mirror the constants the tool historically hard-coded (scene
//! path and a 200 second run timeout). A YAML file can override any field
//! and CLI arguments override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::docker::RunOptions;
use crate::error::ConfigError;

/// Default scene file opened when none is configured.
pub const DEFAULT_SCENE: &str = "scenes/demo.usd";

/// Default run timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 200;

/// Default simulation host executable.
pub const DEFAULT_HOST_EXECUTABLE: &str = "sim-host";

/// Configuration for one lifecycle run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Scene file to load.
    pub scene: PathBuf,
    /// Run duration before the timeout monitor stops everything.
    pub timeout_secs: u64,
    /// Run the simulation host without a window.
    pub headless: bool,
    /// Simulation host executable.
    pub host_executable: PathBuf,
    /// Extra arguments for the host executable.
    pub host_args: Vec<String>,
    /// Auxiliary container launched next to the simulation, if any.
    pub sidecar: Option<SidecarConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scene: PathBuf::from(DEFAULT_SCENE),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            headless: false,
            host_executable: PathBuf::from(DEFAULT_HOST_EXECUTABLE),
            host_args: Vec::new(),
            sidecar: None,
        }
    }
}

impl RunnerConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the scene file.
    pub fn with_scene(mut self, scene: impl Into<PathBuf>) -> Self {
        self.scene = scene.into();
        self
    }

    /// Sets the run timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Runs the host without a window.
    pub fn headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Sets the sidecar container.
    pub fn with_sidecar(mut self, sidecar: SidecarConfig) -> Self {
        self.sidecar = Some(sidecar);
        self
    }

    /// Run timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the config for inconsistencies.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(sidecar) = &self.sidecar {
            sidecar.validate()?;
        }
        Ok(())
    }
}

/// Auxiliary container launched next to the simulation.
///
/// Mappings use the engine's own notation: `host:container` for volumes and
/// ports, `KEY=value` for environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Image to run.
    pub image: String,
    /// Container name, used again at teardown to stop it.
    pub name: String,
    /// Command to run inside the container.
    pub command: Vec<String>,
    /// Volume mounts, `host:container`.
    pub volumes: Vec<String>,
    /// Port mappings, `host:container`.
    pub ports: Vec<String>,
    /// Environment variables, `KEY=value`.
    pub env: Vec<String>,
    /// Network to connect to.
    pub network: Option<String>,
    /// Remove the container after it stops.
    pub remove: bool,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            name: "stagehand-aux".to_string(),
            command: Vec::new(),
            volumes: Vec::new(),
            ports: Vec::new(),
            env: Vec::new(),
            network: None,
            remove: true,
        }
    }
}

impl SidecarConfig {
    /// Creates a sidecar config for the given image.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Check mappings for well-formedness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sidecar image must not be empty".to_string(),
            ));
        }
        for mapping in self.volumes.iter().chain(self.ports.iter()) {
            if !mapping.contains(':') {
                return Err(ConfigError::Invalid(format!(
                    "mapping '{}' is missing the ':' separator",
                    mapping
                )));
            }
        }
        for var in &self.env {
            if !var.contains('=') {
                return Err(ConfigError::Invalid(format!(
                    "environment entry '{}' is missing the '=' separator",
                    var
                )));
            }
        }
        Ok(())
    }

    /// Translate into run options for a detached launch.
    pub fn to_run_options(&self) -> Result<RunOptions, ConfigError> {
        self.validate()?;

        let mut opts = RunOptions::new()
            .detached()
            .with_name(&self.name)
            .with_command(self.command.clone());
        if !self.remove {
            opts = opts.keep_container();
        }
        for volume in &self.volumes {
            if let Some((host, container)) = volume.split_once(':') {
                opts = opts.with_volume(host, container);
            }
        }
        for port in &self.ports {
            if let Some((host, container)) = port.split_once(':') {
                opts = opts.with_port(host, container);
            }
        }
        for var in &self.env {
            if let Some((key, value)) = var.split_once('=') {
                opts = opts.with_env(key, value);
            }
        }
        if let Some(network) = &self.network {
            opts = opts.with_network(network);
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::new();
        assert_eq!(config.scene, PathBuf::from(DEFAULT_SCENE));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.headless);
        assert!(config.sidecar.is_none());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = RunnerConfig::new().with_timeout_secs(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_from_file_partial_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.yaml");
        std::fs::write(
            &path,
            "scene: /scenes/lift.usd\ntimeout_secs: 45\nsidecar:\n  image: nginx:alpine\n",
        )
        .expect("write yaml");

        let config = RunnerConfig::from_file(&path).expect("load");
        assert_eq!(config.scene, PathBuf::from("/scenes/lift.usd"));
        assert_eq!(config.timeout_secs, 45);
        assert!(!config.headless);
        let sidecar = config.sidecar.expect("sidecar");
        assert_eq!(sidecar.image, "nginx:alpine");
        assert_eq!(sidecar.name, "stagehand-aux");
    }

    #[test]
    fn test_from_file_missing() {
        let result = RunnerConfig::from_file(Path::new("/no/such/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_sidecar_empty_image_rejected() {
        let sidecar = SidecarConfig::default();
        assert!(matches!(sidecar.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_sidecar_malformed_mapping_rejected() {
        let mut sidecar = SidecarConfig::new("busybox");
        sidecar.ports.push("8080".to_string());
        assert!(matches!(
            sidecar.to_run_options(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_sidecar_translates_to_detached_run_options() {
        let mut sidecar = SidecarConfig::new("nginx:alpine");
        sidecar.volumes.push("/data:/mnt".to_string());
        sidecar.ports.push("8080:80".to_string());
        sidecar.env.push("MODE=ci".to_string());
        sidecar.network = Some("host".to_string());

        let opts = sidecar.to_run_options().expect("translate");
        assert!(opts.detach);
        assert!(opts.remove);
        assert_eq!(opts.name.as_deref(), Some("stagehand-aux"));
        assert_eq!(opts.volumes, vec![("/data".to_string(), "/mnt".to_string())]);
        assert_eq!(opts.ports, vec![("8080".to_string(), "80".to_string())]);
        assert_eq!(opts.env, vec![("MODE".to_string(), "ci".to_string())]);
        assert_eq!(opts.network.as_deref(), Some("host"));
    }
}
