//! Types for the build stage.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cargo profile used for cross compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  #[default]
  Release,
  Debug,
}

impl BuildMode {
  /// Output subdirectory cargo uses for this profile.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Release => "release",
      Self::Debug => "debug",
    }
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One service to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTarget {
  /// Workspace package name and output binary name.
  pub name: String,
  /// Destination path inside the update tree.
  pub install_path: String,
}

impl BuildTarget {
  pub fn new(name: impl Into<String>, install_path: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      install_path: install_path.into(),
    }
  }
}

/// A built binary, and whether its FLT header has been stamped yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildArtifact {
  /// Name of the target that produced it.
  pub target: String,
  pub path: PathBuf,
  /// Reserved size recorded in the header, once stamping succeeded.
  pub stamped: Option<u32>,
}

impl BuildArtifact {
  pub fn new(target: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    Self {
      target: target.into(),
      path: path.into(),
      stamped: None,
    }
  }

  pub fn with_stamp(mut self, reserved_size: u32) -> Self {
    self.stamped = Some(reserved_size);
    self
  }

  pub fn is_stamped(&self) -> bool {
    self.stamped.is_some()
  }
}

/// Errors from the cross-compilation step.
#[derive(Debug, Error)]
pub enum BuildError {
  /// The compiler exited non-zero.
  #[error("{target}: build failed with exit code {}{}", display_code(*code), display_stderr(stderr))]
  Failed {
    target: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The compiler could not be started.
  #[error("{target}: failed to run {program}: {source}")]
  Spawn {
    target: String,
    program: String,
    #[source]
    source: io::Error,
  },

  /// The compiler succeeded but the expected binary is absent.
  #[error("{target}: build succeeded but {} was not produced", path.display())]
  MissingOutput { target: String, path: PathBuf },
}

impl BuildError {
  /// Name of the target that failed.
  pub fn target(&self) -> &str {
    match self {
      Self::Failed { target, .. } | Self::Spawn { target, .. } | Self::MissingOutput { target, .. } => target,
    }
  }
}

fn display_code(code: Option<i32>) -> String {
  code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string())
}

fn display_stderr(stderr: &str) -> String {
  let trimmed = stderr.trim();
  if trimmed.is_empty() {
    String::new()
  } else {
    format!("\n{}", trimmed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn failed_error_names_target_and_diagnostics() {
    let err = BuildError::Failed {
      target: "shell-service".to_string(),
      code: Some(101),
      stderr: "error: could not compile `shell-service`\n".to_string(),
    };
    let message = err.to_string();
    assert!(message.starts_with("shell-service: build failed with exit code 101"));
    assert!(message.contains("could not compile"));
    assert_eq!(err.target(), "shell-service");
  }

  #[test]
  fn signal_termination_is_described() {
    let err = BuildError::Failed {
      target: "file-service".to_string(),
      code: None,
      stderr: String::new(),
    };
    assert_eq!(
      err.to_string(),
      "file-service: build failed with exit code none (terminated by signal)"
    );
  }

  #[test]
  fn mode_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&BuildMode::Debug).unwrap(), "\"debug\"");
    assert_eq!(BuildMode::default(), BuildMode::Release);
  }
}
