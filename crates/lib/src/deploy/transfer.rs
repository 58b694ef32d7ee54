//! Invocation of the external transfer tools and exit-code classification.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info};

use super::types::{DeployError, DeploymentTarget};

/// How a failed transfer tool exit should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
  Unreachable,
  Partial,
  Failed,
}

/// rsync: socket/protocol/connection errors (and ssh's 255) mean nothing was reached;
/// 23, 24 and 30 mean the run was cut short.
pub fn classify_rsync(code: Option<i32>) -> Failure {
  match code {
    Some(5 | 10 | 12 | 35 | 255) => Failure::Unreachable,
    Some(23 | 24 | 30) => Failure::Partial,
    _ => Failure::Failed,
  }
}

/// curl: resolve/connect/timeout failures are unreachable unless an earlier file already
/// went through; short writes and dropped connections are partial.
pub fn classify_curl(code: Option<i32>, already_sent: usize) -> Failure {
  match code {
    Some(6 | 7 | 28) if already_sent > 0 => Failure::Partial,
    Some(6 | 7 | 28) => Failure::Unreachable,
    Some(18 | 55 | 56) => Failure::Partial,
    _ => Failure::Failed,
  }
}

fn to_error(failure: Failure, destination: &DeploymentTarget, output: &Output, sent: Option<usize>, total: usize) -> DeployError {
  let destination = destination.to_string();
  let code = output.status.code();
  let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

  match failure {
    Failure::Unreachable => DeployError::Unreachable {
      destination,
      code,
      stderr,
    },
    Failure::Partial => DeployError::PartialTransfer {
      destination,
      sent,
      total,
      code,
      stderr,
    },
    Failure::Failed => DeployError::Failed {
      destination,
      code,
      stderr,
    },
  }
}

fn run(tool: &str, cmd: &mut Command) -> Result<Output, DeployError> {
  debug!(command = ?cmd, "spawning transfer");
  let output = cmd.output().map_err(|e| DeployError::Spawn {
    tool: tool.to_string(),
    source: e,
  })?;

  let stdout = String::from_utf8_lossy(&output.stdout);
  if !stdout.trim().is_empty() {
    debug!(tool, stdout = %stdout.trim(), "transfer output");
  }
  Ok(output)
}

/// The rsync command line for syncing `files` into `dest`.
pub fn rsync_command(rsync: &str, files: &[PathBuf], dest: &str) -> Command {
  let mut cmd = Command::new(rsync);
  cmd
    .args(["--archive", "--partial", "--checksum"])
    .args(files)
    .arg(format!("{}/", dest.trim_end_matches('/')));
  cmd
}

/// Sync all files in one rsync run.
pub fn rsync(rsync: &str, files: &[PathBuf], destination: &DeploymentTarget, dest: &str) -> Result<(), DeployError> {
  let output = run(rsync, &mut rsync_command(rsync, files, dest))?;
  if output.status.success() {
    info!(destination = %destination, files = files.len(), "synced");
    return Ok(());
  }

  let failure = classify_rsync(output.status.code());
  Err(to_error(failure, destination, &output, None, files.len()))
}

/// The curl command line for uploading `file` into the TFTP directory `url`.
pub fn tftp_command(client: &str, file: &Path, url: &str) -> Command {
  let mut cmd = Command::new(client);
  cmd
    .args(["--silent", "--show-error", "--upload-file"])
    .arg(file)
    .arg(url);
  cmd
}

/// Upload each file in turn, stopping at the first failure.
pub fn tftp_upload(client: &str, files: &[PathBuf], destination: &DeploymentTarget, url: &str) -> Result<(), DeployError> {
  for (sent, file) in files.iter().enumerate() {
    let output = run(client, &mut tftp_command(client, file, url))?;
    if !output.status.success() {
      let failure = classify_curl(output.status.code(), sent);
      return Err(to_error(failure, destination, &output, Some(sent), files.len()));
    }
    info!(destination = %destination, file = %file.display(), "uploaded");
  }
  Ok(())
}
