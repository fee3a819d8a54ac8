//! Container run options and their CLI flag translation.
//!
//! [`RunOptions`] carries the keyword options for a single `docker run`
//! invocation and translates them one-to-one into command-line flags. A
//! descriptor has no identity beyond the invocation that consumes it.

use serde::{Deserialize, Serialize};

/// Options for a single container run.
///
/// Mappings (volumes, ports, environment) are kept as ordered pairs so the
/// generated argument vector is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Command and arguments to run inside the container.
    pub command: Vec<String>,
    /// Volume mappings as (host path, container path) pairs.
    pub volumes: Vec<(String, String)>,
    /// Port mappings as (host port, container port) pairs.
    pub ports: Vec<(String, String)>,
    /// Environment variables as (key, value) pairs.
    pub env: Vec<(String, String)>,
    /// Container name.
    pub name: Option<String>,
    /// Run the container in the background.
    pub detach: bool,
    /// Remove the container after it stops.
    pub remove: bool,
    /// Keep STDIN open.
    pub interactive: bool,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
    /// Working directory inside the container.
    pub working_dir: Option<String>,
    /// User to run as.
    pub user: Option<String>,
    /// Network to connect to.
    pub network: Option<String>,
    /// Additional raw `docker run` arguments, appended verbatim.
    pub extra_args: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            volumes: Vec::new(),
            ports: Vec::new(),
            env: Vec::new(),
            name: None,
            detach: false,
            remove: true,
            interactive: false,
            tty: false,
            working_dir: None,
            user: None,
            network: None,
            extra_args: Vec::new(),
        }
    }
}

impl RunOptions {
    /// Creates run options with defaults (foreground, auto-remove).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the command to run inside the container.
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the container name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a volume mapping.
    pub fn with_volume(mut self, host: impl Into<String>, container: impl Into<String>) -> Self {
        self.volumes.push((host.into(), container.into()));
        self
    }

    /// Adds a port mapping.
    pub fn with_port(mut self, host: impl Into<String>, container: impl Into<String>) -> Self {
        self.ports.push((host.into(), container.into()));
        self
    }

    /// Adds an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Runs the container in the background.
    pub fn detached(mut self) -> Self {
        self.detach = true;
        self
    }

    /// Keeps the container around after it stops.
    pub fn keep_container(mut self) -> Self {
        self.remove = false;
        self
    }

    /// Keeps STDIN open.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Allocates a pseudo-TTY.
    pub fn with_tty(mut self) -> Self {
        self.tty = true;
        self
    }

    /// Sets the working directory inside the container.
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets the user to run as.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the network to connect to.
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Appends a raw `docker run` argument.
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Translates the options into the argument vector for `docker run`.
    ///
    /// Produces everything after the `run` subcommand: boolean flags, then
    /// name, volumes, ports, environment, working dir, user, network, extra
    /// arguments, the image, and finally the container command.
    pub fn to_args(&self, image: &str) -> Vec<String> {
        let mut args = Vec::new();

        if self.detach {
            args.push("-d".to_string());
        }
        if self.remove {
            args.push("--rm".to_string());
        }
        if self.interactive {
            args.push("-i".to_string());
        }
        if self.tty {
            args.push("-t".to_string());
        }

        if let Some(name) = &self.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }

        for (host, container) in &self.volumes {
            args.push("-v".to_string());
            args.push(format!("{}:{}", host, container));
        }

        for (host, container) in &self.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", host, container));
        }

        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        if let Some(dir) = &self.working_dir {
            args.push("-w".to_string());
            args.push(dir.clone());
        }

        if let Some(user) = &self.user {
            args.push("-u".to_string());
            args.push(user.clone());
        }

        if let Some(network) = &self.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }

        args.extend(self.extra_args.iter().cloned());

        args.push(image.to_string());
        args.extend(self.command.iter().cloned());

        args
    }
}

/// One container as reported by `docker ps --format json`.
///
/// The engine emits one JSON object per line; fields we do not care about
/// are ignored, and missing fields default to empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Names", default)]
    pub names: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Ports", default)]
    pub ports: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
}
