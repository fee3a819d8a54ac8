//! Container-engine CLI wrapper.
//!
//! Every operation shells out to the engine binary (`docker` by default)
//! with a per-call timeout and returns either a typed error or a
//! [`CommandOutput`] record. The availability probe result is cached on the
//! engine; once the probe has failed, every other operation short-circuits
//! without spawning a process.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::docker::options::{ContainerSummary, RunOptions};
use crate::error::EngineError;

/// Timeout for the availability probe in seconds.
const VERSION_TIMEOUT_SECS: u64 = 10;

/// Timeout for local image queries in seconds.
const IMAGES_TIMEOUT_SECS: u64 = 30;

/// Timeout for image pulls in seconds.
const PULL_TIMEOUT_SECS: u64 = 300;

/// Timeout for launching a detached container in seconds (covers the launch
/// only, not the container's own runtime).
const DETACHED_RUN_TIMEOUT_SECS: u64 = 60;

/// Timeout for a blocking container run in seconds.
const BLOCKING_RUN_TIMEOUT_SECS: u64 = 300;

/// Timeout for container listing in seconds.
const PS_TIMEOUT_SECS: u64 = 30;

/// Timeout for stopping a container in seconds.
const STOP_TIMEOUT_SECS: u64 = 30;

/// Captured result of one engine invocation.
///
/// Created per external call and discarded after being returned; there is no
/// cross-call state in these records.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the invocation exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Handle to the container-engine CLI.
///
/// Construct with [`DockerEngine::probe`]; the probe outcome decides whether
/// any later operation is attempted at all.
#[derive(Debug)]
pub struct DockerEngine {
    binary: String,
    version: Option<String>,
}

impl DockerEngine {
    /// Probe the default `docker` binary.
    pub async fn probe() -> Self {
        Self::probe_binary("docker").await
    }

    /// Probe a specific engine binary.
    ///
    /// A failed probe is not an error here: the engine is returned with
    /// availability unset and every operation on it will report
    /// [`EngineError::Unavailable`].
    pub async fn probe_binary(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        let version = match run_cli(&binary, ["--version"], VERSION_TIMEOUT_SECS).await {
            Ok(out) if out.success() => {
                let version = out.stdout.trim().to_string();
                info!(engine = %binary, version = %version, "Container engine available");
                Some(version)
            }
            Ok(out) => {
                warn!(
                    engine = %binary,
                    exit_code = out.exit_code,
                    stderr = %out.stderr.trim(),
                    "Container engine version check failed"
                );
                None
            }
            Err(e) => {
                warn!(engine = %binary, error = %e, "Container engine not found or not responding");
                None
            }
        };

        Self { binary, version }
    }

    /// Whether the availability probe succeeded.
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }

    /// Version string reported by the probe, when available.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn ensure_available(&self) -> Result<(), EngineError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(EngineError::Unavailable(format!(
                "'{}' did not answer the version probe",
                self.binary
            )))
        }
    }

    /// Check whether an image exists locally.
    pub async fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        self.ensure_available()?;

        let out = run_cli(&self.binary, ["images", "-q", image], IMAGES_TIMEOUT_SECS).await?;
        let exists = out.success() && !out.stdout.trim().is_empty();
        if exists {
            debug!(image = image, "Image found locally");
        } else {
            debug!(image = image, "Image not found locally");
        }
        Ok(exists)
    }

    /// Pull an image from the registry.
    pub async fn pull_image(&self, image: &str) -> Result<(), EngineError> {
        self.ensure_available()?;

        info!(image = image, "Pulling image");
        let out = run_cli(&self.binary, ["pull", image], PULL_TIMEOUT_SECS).await?;
        if out.success() {
            info!(image = image, "Image pulled");
            Ok(())
        } else {
            Err(EngineError::PullFailed {
                image: image.to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }

    /// Run a container.
    ///
    /// Checks for the image locally and pulls it when missing; a failed pull
    /// aborts without invoking the run command. The returned record carries
    /// the launch result for detached containers, or the full container
    /// output for blocking runs.
    pub async fn run_container(
        &self,
        image: &str,
        opts: &RunOptions,
    ) -> Result<CommandOutput, EngineError> {
        self.ensure_available()?;

        if !self.image_exists(image).await? {
            info!(image = image, "Image missing locally, pulling before run");
            self.pull_image(image).await?;
        }

        let mut args = vec!["run".to_string()];
        args.extend(opts.to_args(image));

        let timeout_secs = if opts.detach {
            DETACHED_RUN_TIMEOUT_SECS
        } else {
            BLOCKING_RUN_TIMEOUT_SECS
        };

        info!(
            engine = %self.binary,
            command = %args.join(" "),
            detach = opts.detach,
            "Running container"
        );

        let out = run_cli(&self.binary, &args, timeout_secs).await?;
        if !out.success() {
            warn!(
                image = image,
                exit_code = out.exit_code,
                stderr = %out.stderr.trim(),
                "Container run exited with failure"
            );
        }
        Ok(out)
    }

    /// List containers, optionally including stopped ones.
    ///
    /// Parses the engine's line-per-container JSON output; malformed lines
    /// are skipped with a warning.
    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        self.ensure_available()?;

        let mut args = vec!["ps", "--format", "json"];
        if all {
            args.push("-a");
        }

        let out = run_cli(&self.binary, &args, PS_TIMEOUT_SECS).await?;
        if !out.success() {
            return Err(EngineError::ListFailed(out.stderr.trim().to_string()));
        }

        let mut containers = Vec::new();
        for line in out.stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ContainerSummary>(line) {
                Ok(summary) => containers.push(summary),
                Err(e) => warn!(error = %e, line = line, "Skipping unparseable container entry"),
            }
        }
        Ok(containers)
    }

    /// Stop a running container by id or name.
    pub async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.ensure_available()?;

        let out = run_cli(&self.binary, ["stop", id], STOP_TIMEOUT_SECS).await?;
        if out.success() {
            info!(container = id, "Container stopped");
            Ok(())
        } else {
            Err(EngineError::StopFailed {
                id: id.to_string(),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }
}

/// Invoke the engine binary once, with captured output and a hard timeout.
async fn run_cli<I, S>(binary: &str, args: I, timeout_secs: u64) -> Result<CommandOutput, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let result = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await;

    match result {
        Ok(Ok(output)) => Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
        Ok(Err(e)) => Err(EngineError::Io(e)),
        Err(_) => Err(EngineError::Timeout {
            seconds: timeout_secs,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    /// Write an executable stub engine script that appends every invocation
    /// to `log` and dispatches on the first argument.
    #[cfg(unix)]
    fn write_stub(dir: &Path, log: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-engine");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> {}\n{}\n",
            log.display(),
            body
        );
        std::fs::write(&path, script).expect("write stub");
        let mut perms = std::fs::metadata(&path).expect("stat stub").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod stub");
        path
    }

    #[cfg(unix)]
    fn read_log(log: &Path) -> String {
        std::fs::read_to_string(log).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_probe_missing_binary_is_unavailable() {
        let engine = DockerEngine::probe_binary("/nonexistent/engine-binary").await;
        assert!(!engine.is_available());
        assert!(engine.version().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_engine_short_circuits_all_operations() {
        let engine = DockerEngine::probe_binary("/nonexistent/engine-binary").await;

        assert!(matches!(
            engine.image_exists("ubuntu").await,
            Err(EngineError::Unavailable(_))
        ));
        assert!(matches!(
            engine.pull_image("ubuntu").await,
            Err(EngineError::Unavailable(_))
        ));
        assert!(matches!(
            engine.run_container("ubuntu", &RunOptions::new()).await,
            Err(EngineError::Unavailable(_))
        ));
        assert!(matches!(
            engine.list_containers(false).await,
            Err(EngineError::Unavailable(_))
        ));
        assert!(matches!(
            engine.stop_container("abc").await,
            Err(EngineError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_probe_spawns_nothing_else() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("calls.log");
        // Stub fails the version probe but would happily answer anything else.
        let stub = write_stub(
            dir.path(),
            &log,
            "case \"$1\" in --version) exit 1 ;; *) exit 0 ;; esac",
        );

        let engine = DockerEngine::probe_binary(stub.to_string_lossy().to_string()).await;
        assert!(!engine.is_available());

        let _ = engine.run_container("ubuntu", &RunOptions::new()).await;
        let _ = engine.stop_container("abc").await;

        let calls = read_log(&log);
        assert_eq!(calls.trim(), "--version");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pull_failure_aborts_run_before_run_command() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("calls.log");
        let stub = write_stub(
            dir.path(),
            &log,
            concat!(
                "case \"$1\" in\n",
                "  --version) echo 'Docker version 27.0.1' ;;\n",
                "  images) ;;\n", // empty stdout: image missing
                "  pull) echo 'no such image' >&2; exit 1 ;;\n",
                "  run) echo 'should never happen' ;;\n",
                "esac"
            ),
        );

        let engine = DockerEngine::probe_binary(stub.to_string_lossy().to_string()).await;
        assert!(engine.is_available());

        let result = engine.run_container("ghost:latest", &RunOptions::new()).await;
        assert!(matches!(result, Err(EngineError::PullFailed { .. })));

        let calls = read_log(&log);
        assert!(calls.contains("pull ghost:latest"));
        assert!(!calls.contains("run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_local_image_invokes_run_with_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("calls.log");
        let stub = write_stub(
            dir.path(),
            &log,
            concat!(
                "case \"$1\" in\n",
                "  --version) echo 'Docker version 27.0.1' ;;\n",
                "  images) echo 'abc123def' ;;\n",
                "  run) echo 'c0ffee' ;;\n",
                "esac"
            ),
        );

        let engine = DockerEngine::probe_binary(stub.to_string_lossy().to_string()).await;
        let opts = RunOptions::new().detached().with_name("aux");
        let out = engine
            .run_container("busybox", &opts)
            .await
            .expect("run should succeed");

        assert!(out.success());
        assert_eq!(out.stdout.trim(), "c0ffee");

        let calls = read_log(&log);
        assert!(calls.contains("run -d --rm --name aux busybox"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_containers_skips_malformed_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("calls.log");
        let stub = write_stub(
            dir.path(),
            &log,
            concat!(
                "case \"$1\" in\n",
                "  --version) echo 'Docker version 27.0.1' ;;\n",
                "  ps)\n",
                "    echo '{\"ID\":\"aaa\",\"Names\":\"one\",\"State\":\"running\"}'\n",
                "    echo 'not json at all'\n",
                "    echo '{\"ID\":\"bbb\",\"Names\":\"two\",\"State\":\"exited\"}'\n",
                "    ;;\n",
                "esac"
            ),
        );

        let engine = DockerEngine::probe_binary(stub.to_string_lossy().to_string()).await;
        let containers = engine.list_containers(true).await.expect("list");
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "aaa");
        assert_eq!(containers[1].names, "two");

        let calls = read_log(&log);
        assert!(calls.contains("ps --format json -a"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_failure_maps_to_typed_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("calls.log");
        let stub = write_stub(
            dir.path(),
            &log,
            concat!(
                "case \"$1\" in\n",
                "  --version) echo 'Docker version 27.0.1' ;;\n",
                "  stop) echo 'no such container' >&2; exit 1 ;;\n",
                "esac"
            ),
        );

        let engine = DockerEngine::probe_binary(stub.to_string_lossy().to_string()).await;
        let result = engine.stop_container("ghost").await;
        assert!(matches!(result, Err(EngineError::StopFailed { .. })));
    }

    #[test]
    fn test_command_output_success_flag() {
        let ok = CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        let failed = CommandOutput {
            exit_code: 125,
            stdout: String::new(),
            stderr: "boom".to_string(),
        };
        assert!(ok.success());
        assert!(!failed.success());
    }
}
