//! Cross-compilation of a single target.
//!
//! Runs `cargo build` for one package with the toolchain injected into that child
//! process only. Nothing here touches the parent process environment.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::types::{BuildError, BuildMode};
use crate::toolchain::TargetTriple;

/// Arguments passed to cargo for one target.
pub fn cargo_args(package: &str, triple: &TargetTriple, mode: BuildMode) -> Vec<String> {
  let mut args = vec![
    "build".to_string(),
    "--target".to_string(),
    triple.to_string(),
    "--package".to_string(),
    package.to_string(),
  ];
  if mode == BuildMode::Release {
    args.push("--release".to_string());
  }
  args
}

/// Compile one package.
///
/// # Arguments
///
/// * `cargo` - The cargo program to run
/// * `package` - Workspace package name
/// * `triple` - Cross-compilation target
/// * `mode` - Release or debug profile
/// * `source_dir` - Working directory of the build
/// * `target_dir` - Pinned `CARGO_TARGET_DIR`
/// * `env` - Toolchain variables for this invocation
///
/// # Returns
///
/// The captured stdout on success (trimmed).
pub fn execute_cargo(
  cargo: &str,
  package: &str,
  triple: &TargetTriple,
  mode: BuildMode,
  source_dir: &Path,
  target_dir: &Path,
  env: &BTreeMap<String, OsString>,
) -> Result<String, BuildError> {
  let args = cargo_args(package, triple, mode);
  info!(service = package, triple = %triple, mode = %mode, "compiling");

  let mut command = Command::new(cargo);
  command
    .args(&args)
    .current_dir(source_dir)
    .env("CARGO_TARGET_DIR", target_dir)
    .envs(env);

  debug!(program = cargo, args = ?args, cwd = %source_dir.display(), "spawning process");

  let output = command.output().map_err(|e| BuildError::Spawn {
    target: package.to_string(),
    program: cargo.to_string(),
    source: e,
  })?;

  let stderr = String::from_utf8_lossy(&output.stderr);
  let stdout = String::from_utf8_lossy(&output.stdout);

  if !output.status.success() {
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(BuildError::Failed {
      target: package.to_string(),
      code: output.status.code(),
      stderr: stderr.into_owned(),
    });
  }

  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }

  Ok(stdout.trim().to_string())
}
