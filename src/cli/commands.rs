//! CLI command definitions for stagehand.
//!
//! This module provides the command-line interface for driving a full
//! simulation lifecycle run and the container conveniences around it.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use crate::config::{RunnerConfig, SidecarConfig};
use crate::docker::DockerEngine;
use crate::runner::Runner;
use crate::sim::{HostConfig, ProcessHost, SimSession};

/// Default container engine binary.
const DEFAULT_ENGINE: &str = "docker";

/// Simulation lifecycle controller.
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Run a simulation scene with a sidecar container and a bounded lifetime")]
#[command(version)]
#[command(
    long_about = "stagehand starts a simulation host, loads a scene, starts playback, launches an auxiliary container, and tears everything down on timeout or ctrl-c.\n\nExample usage:\n  stagehand run --scene scenes/lift.usd --timeout 200 --headless"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the full lifecycle: simulation, sidecar, timeout, teardown.
    Run(RunArgs),

    /// Probe the environment without starting anything.
    Check(CheckArgs),

    /// List containers known to the engine.
    Ps(PsArgs),

    /// Stop a container by id or name.
    Stop(StopArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scene file to load.
    #[arg(short, long)]
    pub scene: Option<PathBuf>,

    /// Run timeout in seconds.
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Run the simulation host without a window.
    #[arg(long)]
    pub headless: bool,

    /// Simulation host executable (can also be set via STAGEHAND_HOST).
    #[arg(long, env = "STAGEHAND_HOST")]
    pub host_executable: Option<PathBuf>,

    /// YAML config file; CLI arguments override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Sidecar image to launch next to the simulation.
    #[arg(long)]
    pub sidecar_image: Option<String>,

    /// Sidecar container name.
    #[arg(long)]
    pub sidecar_name: Option<String>,

    /// Skip launching the sidecar container.
    #[arg(long, conflicts_with = "sidecar_image")]
    pub no_sidecar: bool,

    /// Container engine binary.
    #[arg(long, default_value = DEFAULT_ENGINE, env = "STAGEHAND_ENGINE")]
    pub engine: String,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// YAML config file to check.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Scene file to check.
    #[arg(short, long)]
    pub scene: Option<PathBuf>,

    /// Sidecar image to look for locally.
    #[arg(long)]
    pub sidecar_image: Option<String>,

    /// Container engine binary.
    #[arg(long, default_value = DEFAULT_ENGINE, env = "STAGEHAND_ENGINE")]
    pub engine: String,
}

/// Arguments for the `ps` command.
#[derive(Parser, Debug)]
pub struct PsArgs {
    /// Include stopped containers.
    #[arg(short, long)]
    pub all: bool,

    /// Output JSON instead of a table.
    #[arg(short, long)]
    pub json: bool,

    /// Container engine binary.
    #[arg(long, default_value = DEFAULT_ENGINE, env = "STAGEHAND_ENGINE")]
    pub engine: String,
}

/// Arguments for the `stop` command.
#[derive(Parser, Debug)]
pub struct StopArgs {
    /// Container id or name.
    pub container: String,

    /// Container engine binary.
    #[arg(long, default_value = DEFAULT_ENGINE, env = "STAGEHAND_ENGINE")]
    pub engine: String,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the stagehand CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_run_command(args).await,
        Commands::Check(args) => run_check_command(args).await,
        Commands::Ps(args) => run_ps_command(args).await,
        Commands::Stop(args) => run_stop_command(args).await,
    }
}

// ============================================================================
// Run command
// ============================================================================

/// Merge the config file (when given) with CLI overrides.
fn resolve_run_config(args: &RunArgs) -> anyhow::Result<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::new(),
    };

    if let Some(scene) = &args.scene {
        config.scene = scene.clone();
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.headless {
        config.headless = true;
    }
    if let Some(executable) = &args.host_executable {
        config.host_executable = executable.clone();
    }

    if args.no_sidecar {
        config.sidecar = None;
    } else if let Some(image) = &args.sidecar_image {
        let mut sidecar = config.sidecar.take().unwrap_or_else(|| SidecarConfig::new(image));
        sidecar.image = image.clone();
        config.sidecar = Some(sidecar);
    }
    if let Some(name) = &args.sidecar_name {
        if let Some(sidecar) = config.sidecar.as_mut() {
            sidecar.name = name.clone();
        }
    }

    config.validate()?;
    Ok(config)
}

async fn run_run_command(args: RunArgs) -> anyhow::Result<()> {
    let config = resolve_run_config(&args)?;

    info!(
        scene = %config.scene.display(),
        timeout_secs = config.timeout_secs,
        headless = config.headless,
        "Starting lifecycle run"
    );

    let engine = DockerEngine::probe_binary(&args.engine).await;
    if !engine.is_available() && config.sidecar.is_some() {
        warn!("Container engine unavailable, the sidecar will be skipped");
    }

    let mut host_config = HostConfig::new(&config.host_executable);
    if config.headless {
        host_config = host_config.headless();
    }
    for arg in &config.host_args {
        host_config = host_config.with_arg(arg);
    }

    let host = ProcessHost::launch(host_config).await?;
    let mut session = SimSession::new(Box::new(host));

    let runner = Runner::new(config);
    let summary = runner.run(&engine, &mut session).await?;

    println!("Run finished: {}", summary.stop_reason);
    println!("  elapsed: {}s", summary.elapsed.as_secs());
    println!("  ticks:   {}", summary.ticks);
    match &summary.sidecar {
        Some(name) if summary.sidecar_stopped => println!("  sidecar: {} (stopped)", name),
        Some(name) => println!("  sidecar: {} (left running)", name),
        None => println!("  sidecar: none"),
    }

    Ok(())
}

// ============================================================================
// Check command
// ============================================================================

async fn run_check_command(args: CheckArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::new(),
    };
    if let Some(scene) = &args.scene {
        config.scene = scene.clone();
    }
    if let Some(image) = &args.sidecar_image {
        let mut sidecar = config.sidecar.take().unwrap_or_else(|| SidecarConfig::new(image));
        sidecar.image = image.clone();
        config.sidecar = Some(sidecar);
    }

    let engine = DockerEngine::probe_binary(&args.engine).await;
    let runner = Runner::new(config);
    let report = runner.preflight(&engine).await;

    match &report.engine_version {
        Some(version) => println!("engine:  ok ({})", version),
        None => println!("engine:  MISSING ({})", args.engine),
    }
    match report.sidecar_image_present {
        Some(true) => println!("image:   present"),
        Some(false) => println!("image:   not present (will be pulled on run)"),
        None => println!("image:   not checked"),
    }
    println!(
        "scene:   {}",
        if report.scene_exists {
            "found"
        } else {
            "missing (run would use an empty stage)"
        }
    );

    if report.engine_version.is_none() {
        anyhow::bail!("container engine '{}' is not available", args.engine);
    }
    Ok(())
}

// ============================================================================
// Container conveniences
// ============================================================================

async fn run_ps_command(args: PsArgs) -> anyhow::Result<()> {
    let engine = DockerEngine::probe_binary(&args.engine).await;
    let containers = engine.list_containers(args.all).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&containers)?);
        return Ok(());
    }

    println!(
        "{:<14} {:<24} {:<20} {:<10} {}",
        "ID", "IMAGE", "NAMES", "STATE", "STATUS"
    );
    for c in &containers {
        println!(
            "{:<14} {:<24} {:<20} {:<10} {}",
            c.id, c.image, c.names, c.state, c.status
        );
    }
    Ok(())
}

async fn run_stop_command(args: StopArgs) -> anyhow::Result<()> {
    let engine = DockerEngine::probe_binary(&args.engine).await;
    engine.stop_container(&args.container).await?;
    println!("{}", args.container);
    Ok(())
}
