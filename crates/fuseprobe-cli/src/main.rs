//! fuseprobe CLI application
//!
//! Generates single-op and fused-block test models for fusion rules,
//! profiles them on a backend, and reports which rules the backend fuses.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use fuseprobe_cli::commands::{
    BackendsCommand, CommandContext, ConnectCommand, CreateCommand, DetectCommand, GenerateCommand,
    ProfileCommand, RulesCommand, RunCommand, StatusCommand,
};
use fuseprobe_cli::exit::{exit_code_for, EXIT_SUCCESS};
use fuseprobe_cli::output::{OutputConfig, OutputFormat};
use fuseprobe_cli::Workspace;
use fuseprobe_common::{FuseProbeConfig, LoggingConfig};
use tracing::error;

/// fuseprobe - fusion rule detection for inference backends
#[derive(Parser)]
#[command(name = "fuseprobe")]
#[command(about = "Detect which operator fusions an inference backend applies")]
#[command(long_about = r#"
fuseprobe builds small test models for candidate fusion rules, profiles each
operator alone and the fused block on a backend, and judges a rule fused when
the block runs meaningfully faster than its parts.

Examples:
  # Create a workspace in the current directory
  fuseprobe create

  # List the rules the config enables
  fuseprobe rules

  # Generate, profile and detect
  fuseprobe run

  # Only the basic conv rules, step by step
  fuseprobe generate --filter BF_conv
  fuseprobe profile
  fuseprobe detect
"#)]
#[command(version)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, value_name = "DIR", default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path (defaults to <workspace>/fuseprobe.toml)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Output format (text or json)
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    format: OutputFormat,

    /// Suppress status messages and progress
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a workspace with a default config
    #[command(alias = "init")]
    Create(CreateCommand),

    /// List the selected fusion rules
    Rules(RulesCommand),

    /// List profiling backends
    Backends(BackendsCommand),

    /// Check the configured backend's connection
    Connect(ConnectCommand),

    /// Generate test cases
    #[command(alias = "gen")]
    Generate(GenerateCommand),

    /// Profile generated models
    Profile(ProfileCommand),

    /// Decide fusion rules from profiled latencies
    Detect(DetectCommand),

    /// Generate, profile and detect
    Run(RunCommand),

    /// Show per-rule pipeline progress
    Status(StatusCommand),
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate_completions(shell);
        return;
    }

    let code = match execute(cli) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!("Command failed: {}", e);
            for cause in e.chain().skip(1) {
                error!("  Caused by: {}", cause);
            }
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn execute(cli: Cli) -> Result<()> {
    let mut workspace = Workspace::new(&cli.workspace);
    if let Some(path) = &cli.config {
        workspace = workspace.with_config_path(path);
    }

    let config = workspace.load_config();
    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    setup_logging(&logging, cli.log_level.as_deref(), cli.quiet);

    let ctx = CommandContext::new(workspace, OutputConfig { format: cli.format, quiet: cli.quiet });
    let Some(command) = cli.command else {
        let mut cmd = Cli::command();
        cmd.print_help()?;
        return Ok(());
    };

    let config_path = ctx.workspace.config_path();
    let load = move || -> Result<FuseProbeConfig> {
        config.with_context(|| format!("failed to load configuration from {}", config_path.display()))
    };
    match command {
        Commands::Create(cmd) => cmd.execute(&ctx),
        Commands::Status(cmd) => cmd.execute(&ctx),
        Commands::Rules(cmd) => cmd.execute(&ctx, &load()?),
        Commands::Backends(cmd) => cmd.execute(&ctx, &load()?),
        Commands::Connect(cmd) => cmd.execute(&ctx, &load()?),
        Commands::Generate(cmd) => cmd.execute(&ctx, &load()?),
        Commands::Profile(cmd) => cmd.execute(&ctx, &load()?),
        Commands::Detect(cmd) => cmd.execute(&ctx, &load()?),
        Commands::Run(cmd) => cmd.execute(&ctx, &load()?),
    }
}

/// Setup logging: `RUST_LOG` wins, then `--log-level`, then `logging.level`.
fn setup_logging(logging: &LoggingConfig, log_level_override: Option<&str>, quiet: bool) {
    let level = match (log_level_override, quiet) {
        (Some(level), _) => level,
        (None, true) => "error",
        (None, false) => logging.level.as_str(),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    match logging.format.as_str() {
        "json" => {
            subscriber.json().with_timer(tracing_subscriber::fmt::time::uptime()).init();
        }
        "compact" => {
            subscriber.compact().init();
        }
        _ => {
            subscriber.pretty().init();
        }
    }
}

/// Generate shell completions
fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
