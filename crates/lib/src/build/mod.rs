//! Build orchestration.
//!
//! Targets are cross-compiled one after another, in exactly the order given. The first
//! failure stops the run: later targets are never attempted and binaries already built
//! by earlier targets are left on disk as they are.
//!
//! # Submodules
//!
//! - [`execute`] - Cross-compilation of a single target

pub mod execute;
mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::toolchain::{TargetTriple, ToolchainConfig};

/// How and where cargo runs. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
  pub cargo: String,
  pub source_dir: PathBuf,
  pub target_dir: PathBuf,
  pub mode: BuildMode,
}

impl BuildOptions {
  /// Where cargo leaves the binary for `name`: `<target_dir>/<triple>/<mode>/<name>`.
  pub fn artifact_path(&self, triple: &TargetTriple, name: &str) -> PathBuf {
    self
      .target_dir
      .join(triple.as_str())
      .join(self.mode.as_str())
      .join(name)
  }
}

/// Cross-compile every target, in order, failing fast.
///
/// Returns one artifact per target in input order. None of them is stamped yet.
pub fn build(
  targets: &[BuildTarget],
  triple: &TargetTriple,
  toolchain: &ToolchainConfig,
  options: &BuildOptions,
) -> Result<Vec<BuildArtifact>, BuildError> {
  let env = toolchain.cross_env(triple);
  let mut artifacts = Vec::with_capacity(targets.len());

  for (index, target) in targets.iter().enumerate() {
    let result = execute::execute_cargo(
      &options.cargo,
      &target.name,
      triple,
      options.mode,
      &options.source_dir,
      &options.target_dir,
      &env,
    );

    if let Err(err) = result {
      let skipped: Vec<&str> = targets[index + 1..].iter().map(|t| t.name.as_str()).collect();
      if !skipped.is_empty() {
        warn!(failed = %target.name, skipped = ?skipped, "aborting build, remaining targets not attempted");
      }
      return Err(err);
    }

    let path = options.artifact_path(triple, &target.name);
    if !is_file(&path) {
      return Err(BuildError::MissingOutput {
        target: target.name.clone(),
        path,
      });
    }

    info!(service = %target.name, path = %path.display(), "built");
    artifacts.push(BuildArtifact::new(&target.name, path));
  }

  Ok(artifacts)
}

fn is_file(path: &Path) -> bool {
  std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
