mod build;
mod deploy;
mod inspect;
mod package;
mod toolchain;
mod verify;

pub use build::cmd_build;
pub use deploy::{cmd_deploy, cmd_deploy_archive};
pub use inspect::cmd_inspect;
pub use package::cmd_package;
pub use toolchain::cmd_toolchain;
pub use verify::cmd_verify;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use tracing::debug;

use fltrel_lib::build::{BuildArtifact, BuildMode};
use fltrel_lib::config::{PipelineConfig, paths};
use fltrel_lib::pipeline::Pipeline;

use crate::output::{OutputFormat, print_stat};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
  Release,
  Debug,
}

impl From<ModeArg> for BuildMode {
  fn from(mode: ModeArg) -> Self {
    match mode {
      ModeArg::Release => BuildMode::Release,
      ModeArg::Debug => BuildMode::Debug,
    }
  }
}

/// Target selection shared by every command that builds.
#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
  /// Services to build, space- or comma-separated (default: every configured target)
  #[arg(value_delimiter = ',')]
  pub targets: Vec<String>,

  /// Target triple (default: from configuration)
  #[arg(long)]
  pub triple: Option<String>,

  /// Build profile (default: from configuration)
  #[arg(long, value_enum)]
  pub mode: Option<ModeArg>,
}

impl BuildArgs {
  /// Requested target names with empty entries from stray commas dropped.
  pub fn target_names(&self) -> Vec<String> {
    self
      .targets
      .iter()
      .map(|t| t.trim())
      .filter(|t| !t.is_empty())
      .map(str::to_string)
      .collect()
  }
}

/// Workspace and configuration shared by every command.
pub struct Context {
  pub workspace: PathBuf,
  pub config: PipelineConfig,
  pub output: OutputFormat,
}

impl Context {
  pub fn load(workspace: Option<&Path>, config: Option<&Path>, output: OutputFormat) -> Result<Self> {
    let workspace = paths::workspace_root(workspace).context("Failed to locate workspace")?;
    let config_path = paths::config_path(config, &workspace);
    debug!(workspace = %workspace.display(), config = ?config_path, "loading context");

    let config = PipelineConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    Ok(Self {
      workspace,
      config,
      output,
    })
  }

  /// Resolve the toolchain with any command-line overrides applied.
  pub fn pipeline(&self, build: &BuildArgs) -> Result<Pipeline> {
    let mut config = self.config.clone();
    if let Some(triple) = &build.triple {
      config.triple = triple.clone();
    }
    if let Some(mode) = build.mode {
      config.mode = mode.into();
    }
    Ok(Pipeline::new(config, &self.workspace)?)
  }
}

pub(crate) fn print_artifacts(artifacts: &[BuildArtifact]) {
  for artifact in artifacts {
    let stamp = artifact
      .stamped
      .map(|size| format!(" (stack {:#x})", size))
      .unwrap_or_default();
    print_stat(&artifact.target, &format!("{}{}", artifact.path.display(), stamp));
  }
}
