mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::BuildArgs;
use output::{OutputFormat, print_error};

/// fltrel - build, stamp, package and deploy the FLT service fleet
#[derive(Parser)]
#[command(name = "fltrel")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Workspace root (default: $FLTREL_WORKSPACE, then the current directory)
  #[arg(long, global = true, value_name = "DIR")]
  workspace: Option<PathBuf>,

  /// Configuration file (default: $FLTREL_CONFIG, then <workspace>/fltrel.toml)
  #[arg(short, long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Cross-compile and stamp services
  BuildTargets {
    #[command(flatten)]
    build: BuildArgs,
  },

  /// Build, stamp and package services into a release archive
  Package {
    #[command(flatten)]
    build: BuildArgs,

    /// Directory the archive is written to (default: [release] output_dir)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
  },

  /// Build, stamp, then ship the release archive or the raw binaries
  PackageAndDeploy {
    #[command(flatten)]
    build: BuildArgs,

    /// rsync destination (host:/dir, user@host:/dir, local dir) or tftp://host[:port]/dir
    #[arg(short, long)]
    destination: String,

    /// Ship the packaged archive (default)
    #[arg(long, conflicts_with = "raw")]
    archive: bool,

    /// Ship the stamped binaries without packaging
    #[arg(long)]
    raw: bool,

    /// Directory the archive is written to (default: [release] output_dir)
    #[arg(long, value_name = "DIR", conflicts_with = "raw")]
    output_dir: Option<PathBuf>,
  },

  /// Ship an already packaged archive without building or packaging again
  Deploy {
    /// rsync destination (host:/dir, user@host:/dir, local dir) or tftp://host[:port]/dir
    #[arg(short, long)]
    destination: String,

    /// Archive to ship (default: <[release] output_dir>/<[release] archive_name>)
    archive: Option<PathBuf>,
  },

  /// Check a release archive against its embedded manifest
  Verify {
    /// Path to the archive
    archive: PathBuf,
  },

  /// Resolve and show the cross toolchain
  Toolchain,

  /// Show the FLT header of built binaries
  Inspect {
    /// Binaries to inspect
    #[arg(required = true)]
    binaries: Vec<PathBuf>,
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

fn run(cli: Cli) -> anyhow::Result<()> {
  let ctx = cmd::Context::load(cli.workspace.as_deref(), cli.config.as_deref(), cli.output)?;

  match cli.command {
    Commands::BuildTargets { build } => cmd::cmd_build(&ctx, &build),
    Commands::Package { build, output_dir } => cmd::cmd_package(&ctx, &build, output_dir),
    Commands::PackageAndDeploy {
      build,
      destination,
      archive: _,
      raw,
      output_dir,
    } => cmd::cmd_deploy(&ctx, &build, &destination, raw, output_dir),
    Commands::Deploy { destination, archive } => cmd::cmd_deploy_archive(&ctx, archive, &destination),
    Commands::Verify { archive } => cmd::cmd_verify(&ctx, &archive),
    Commands::Toolchain => cmd::cmd_toolchain(&ctx),
    Commands::Inspect { binaries } => cmd::cmd_inspect(&ctx, &binaries),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
