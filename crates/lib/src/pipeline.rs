//! The release pipeline: resolve, build, stamp, package, deploy.
//!
//! Each [`Flow`] runs a prefix of the same stage sequence. A [`Pipeline`] is built once
//! per run from the validated configuration and the resolved toolchain; every stage reads
//! those values and nothing else, so any stage can be re-run with the same inputs.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span};

use crate::build::{self, BuildArtifact, BuildError, BuildOptions, BuildTarget};
use crate::config::{ConfigurationError, PipelineConfig};
use crate::deploy::{self, DeployError, DeploymentResult, DeploymentTarget, Payload};
use crate::package::{self, PackageOptions, PackagingError, ReleaseArchive};
use crate::stamp::{self, StampError};
use crate::toolchain::{TargetTriple, ToolchainConfig};

/// Which stages to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
  /// Build and stamp.
  Local,
  /// Build, stamp, package.
  Package,
  /// Build, stamp, ship the stamped binaries.
  DeployRaw(DeploymentTarget),
  /// Build, stamp, package, ship the archive.
  DeployArchive(DeploymentTarget),
}

impl Flow {
  pub fn packages(&self) -> bool {
    matches!(self, Self::Package | Self::DeployArchive(_))
  }
}

/// One pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
  /// Target names; empty means every configured target.
  pub targets: Vec<String>,
  pub flow: Flow,
  /// Overrides `[release] output_dir`.
  pub output_dir: Option<PathBuf>,
}

impl ReleaseRequest {
  pub fn new(targets: Vec<String>, flow: Flow) -> Self {
    Self {
      targets,
      flow,
      output_dir: None,
    }
  }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseOutcome {
  pub triple: TargetTriple,
  pub reserved_size: u32,
  pub artifacts: Vec<BuildArtifact>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub archive: Option<ReleaseArchive>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deployment: Option<DeploymentResult>,
}

/// The stage a [`PipelineError`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Configuration,
  Build,
  Stamp,
  Package,
  Deploy,
}

impl Stage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Configuration => "configuration",
      Self::Build => "build",
      Self::Stamp => "stamp",
      Self::Package => "package",
      Self::Deploy => "deploy",
    }
  }
}

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("configuration stage failed")]
  Configuration(#[from] ConfigurationError),

  #[error("build stage failed")]
  Build(#[from] BuildError),

  #[error("stamp stage failed")]
  Stamp(#[from] StampError),

  #[error("package stage failed")]
  Package(#[from] PackagingError),

  #[error("deploy stage failed")]
  Deploy(#[from] DeployError),
}

impl PipelineError {
  pub fn stage(&self) -> Stage {
    match self {
      Self::Configuration(_) => Stage::Configuration,
      Self::Build(_) => Stage::Build,
      Self::Stamp(_) => Stage::Stamp,
      Self::Package(_) => Stage::Package,
      Self::Deploy(_) => Stage::Deploy,
    }
  }
}

/// Validated configuration plus the toolchain resolved against a workspace.
#[derive(Debug, Clone)]
pub struct Pipeline {
  config: PipelineConfig,
  triple: TargetTriple,
  toolchain: ToolchainConfig,
}

impl Pipeline {
  /// Validate `config` and resolve its toolchain under `workspace_root`.
  ///
  /// Nothing is built until every toolchain path has been checked.
  pub fn new(config: PipelineConfig, workspace_root: &Path) -> Result<Self, PipelineError> {
    config.validate()?;
    let triple = config.target_triple()?;
    let toolchain = ToolchainConfig::resolve(workspace_root, &config.toolchain)?;
    Ok(Self {
      config,
      triple,
      toolchain,
    })
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn triple(&self) -> &TargetTriple {
    &self.triple
  }

  pub fn toolchain(&self) -> &ToolchainConfig {
    &self.toolchain
  }

  fn workspace_path(&self, path: &Path) -> PathBuf {
    self.toolchain.workspace_root.join(path)
  }

  pub fn build_options(&self) -> BuildOptions {
    BuildOptions {
      cargo: self.config.build.cargo.clone(),
      source_dir: self.workspace_path(&self.config.build.source_dir),
      target_dir: self.workspace_path(&self.config.build.target_dir),
      mode: self.config.mode,
    }
  }

  pub fn package_options(&self, output_dir: Option<&Path>) -> PackageOptions {
    let release = &self.config.release;
    PackageOptions {
      output_dir: self.workspace_path(output_dir.unwrap_or(&release.output_dir)),
      archive_name: release.archive_name.clone(),
      manifest_name: release.manifest_name.clone(),
      reserved_size: self.config.reserved_size,
    }
  }

  /// Cross-compile then stamp `targets`.
  pub fn build(&self, targets: &[BuildTarget]) -> Result<Vec<BuildArtifact>, PipelineError> {
    let built = build::build(targets, &self.triple, &self.toolchain, &self.build_options())?;
    let stamped = stamp::stamp_all(&built, self.config.reserved_size, &self.toolchain.stamper)?;
    Ok(stamped)
  }

  pub fn package(
    &self,
    targets: &[BuildTarget],
    artifacts: &[BuildArtifact],
    output_dir: Option<&Path>,
  ) -> Result<ReleaseArchive, PipelineError> {
    let layout = PipelineConfig::stage_layout(targets);
    Ok(package::package(artifacts, &layout, &self.package_options(output_dir))?)
  }

  pub fn deploy(&self, payload: &Payload, destination: &DeploymentTarget) -> Result<DeploymentResult, PipelineError> {
    Ok(deploy::deploy(payload, destination, &self.config.deploy)?)
  }

  /// Run the stages `request.flow` calls for, stopping at the first failure.
  pub fn run(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome, PipelineError> {
    let targets = self.config.select_targets(&request.targets)?;
    let span = info_span!("release", triple = %self.triple, targets = targets.len());
    let _enter = span.enter();

    let artifacts = self.build(&targets)?;

    let archive = if request.flow.packages() {
      Some(self.package(&targets, &artifacts, request.output_dir.as_deref())?)
    } else {
      None
    };

    let deployment = match (&request.flow, &archive) {
      (Flow::DeployArchive(dest), Some(archive)) => Some(self.deploy(&Payload::Archive(archive.clone()), dest)?),
      (Flow::DeployRaw(dest), _) => Some(self.deploy(&Payload::Raw(artifacts.clone()), dest)?),
      _ => None,
    };

    info!(
      artifacts = artifacts.len(),
      archive = archive.is_some(),
      deployed = deployment.is_some(),
      "release complete"
    );

    Ok(ReleaseOutcome {
      triple: self.triple.clone(),
      reserved_size: self.config.reserved_size,
      artifacts,
      archive,
      deployment,
    })
  }
}
