mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{cmd_clean, cmd_status, cmd_workspace};
use output::{OutputFormat, print_error};

/// kiln - cache-aware project builds
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// JSON file with build settings
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the project if needed and summarize its workspace
  Workspace {
    /// Project root directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Project file name, when the root holds more than one
    #[arg(short, long)]
    project: Option<String>,
  },

  /// Show whether the last build can be reused
  Status {
    /// Project root directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Project file name, when the root holds more than one
    #[arg(short, long)]
    project: Option<String>,
  },

  /// Remove build logs, intermediate output and the last build error
  Clean {
    /// Project root directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Project file name, when the root holds more than one
    #[arg(short, long)]
    project: Option<String>,
  },
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let config = cli.config.as_deref();
  let result = match &cli.command {
    Commands::Workspace { dir, project } => cmd_workspace(dir, project.as_deref(), config, cli.output),
    Commands::Status { dir, project } => cmd_status(dir, project.as_deref(), config, cli.output),
    Commands::Clean { dir, project } => cmd_clean(dir, project.as_deref(), config, cli.output, cli.verbose),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}
