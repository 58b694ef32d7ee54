//! Types for the deployment stage.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::build::BuildArtifact;
use crate::package::ReleaseArchive;

/// Default TFTP port.
pub const TFTP_PORT: u16 = 69;

const TFTP_SCHEME: &str = "tftp://";

/// External programs used for transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TransferTools {
  pub rsync: String,
  /// Client used for TFTP uploads. Invoked with curl's command line.
  pub tftp_client: String,
}

impl Default for TransferTools {
  fn default() -> Self {
    Self {
      rsync: "rsync".to_string(),
      tftp_client: "curl".to_string(),
    }
  }
}

/// Where a release goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeploymentTarget {
  /// Anything rsync accepts as a destination directory: `host:/dir`, `user@host:/dir`,
  /// or a local path.
  RemotePath { path: String },
  /// A network-boot server reached over TFTP.
  Netboot { host: String, port: u16, dir: String },
}

impl DeploymentTarget {
  pub fn remote(path: impl Into<String>) -> Self {
    Self::RemotePath { path: path.into() }
  }

  /// Directory URL files are uploaded into, with a trailing `/`.
  pub fn tftp_url(host: &str, port: u16, dir: &str) -> String {
    if dir.is_empty() {
      format!("{}{}:{}/", TFTP_SCHEME, host, port)
    } else {
      format!("{}{}:{}/{}/", TFTP_SCHEME, host, port, dir)
    }
  }
}

impl fmt::Display for DeploymentTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::RemotePath { path } => f.write_str(path),
      Self::Netboot { host, port, dir } => {
        let url = Self::tftp_url(host, *port, dir);
        f.write_str(url.trim_end_matches('/'))
      }
    }
  }
}

impl FromStr for DeploymentTarget {
  type Err = DeployError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = |reason: &str| DeployError::InvalidDestination {
      destination: s.to_string(),
      reason: reason.to_string(),
    };

    let s_trimmed = s.trim();
    if s_trimmed.is_empty() {
      return Err(invalid("empty destination"));
    }

    let Some(rest) = s_trimmed.strip_prefix(TFTP_SCHEME) else {
      if s_trimmed.contains("://") {
        return Err(invalid("only tftp:// URLs are supported"));
      }
      return Ok(Self::remote(s_trimmed));
    };

    let (authority, dir) = rest.split_once('/').unwrap_or((rest, ""));
    let (host, port) = match authority.rsplit_once(':') {
      Some((host, port)) => {
        let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;
        if port == 0 {
          return Err(invalid("invalid port"));
        }
        (host, port)
      }
      None => (authority, TFTP_PORT),
    };
    if host.is_empty() {
      return Err(invalid("missing host"));
    }

    let dir = dir.trim_matches('/');
    if dir.split('/').any(|part| part == "..") {
      return Err(invalid("directory escapes the server root"));
    }

    Ok(Self::Netboot {
      host: host.to_string(),
      port,
      dir: dir.to_string(),
    })
  }
}

/// What gets shipped.
#[derive(Debug, Clone)]
pub enum Payload {
  Archive(ReleaseArchive),
  /// Stamped binaries, shipped as they are.
  Raw(Vec<BuildArtifact>),
}

impl Payload {
  /// Files to transfer, in order.
  pub fn files(&self) -> Result<Vec<PathBuf>, DeployError> {
    let files = match self {
      Self::Archive(archive) => vec![archive.path.clone()],
      Self::Raw(artifacts) => {
        if let Some(unstamped) = artifacts.iter().find(|a| !a.is_stamped()) {
          return Err(DeployError::Unstamped(unstamped.target.clone()));
        }
        artifacts.iter().map(|a| a.path.clone()).collect()
      }
    };

    if files.is_empty() {
      return Err(DeployError::EmptyPayload);
    }
    if let Some(missing) = files.iter().find(|p| !p.is_file()) {
      return Err(DeployError::MissingPayloadFile(missing.clone()));
    }
    Ok(files)
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Self::Archive(_) => "archive",
      Self::Raw(_) => "raw",
    }
  }
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
  pub destination: DeploymentTarget,
  pub files: Vec<PathBuf>,
  pub bytes: u64,
}

#[derive(Debug, Error)]
pub enum DeployError {
  /// Nothing reached the destination; the transfer can be retried as is.
  #[error("{destination}: destination unreachable (exit code {}){}", fmt_code(*code), fmt_stderr(stderr))]
  Unreachable {
    destination: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The transfer stopped part way; retry the whole deploy.
  ///
  /// `sent` is known only when files go one at a time.
  #[error("{destination}: partial transfer, {} (exit code {}){}", fmt_progress(*sent, *total), fmt_code(*code), fmt_stderr(stderr))]
  PartialTransfer {
    destination: String,
    sent: Option<usize>,
    total: usize,
    code: Option<i32>,
    stderr: String,
  },

  #[error("{destination}: transfer failed (exit code {}){}", fmt_code(*code), fmt_stderr(stderr))]
  Failed {
    destination: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to run {tool}: {source}")]
  Spawn {
    tool: String,
    #[source]
    source: io::Error,
  },

  #[error("invalid destination '{destination}': {reason}")]
  InvalidDestination { destination: String, reason: String },

  #[error("nothing to deploy")]
  EmptyPayload,

  #[error("payload file {} does not exist", .0.display())]
  MissingPayloadFile(PathBuf),

  #[error("{0} is not stamped and cannot be deployed")]
  Unstamped(String),
}

impl DeployError {
  /// Whether retrying the same deploy can succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Unreachable { .. } | Self::PartialTransfer { .. })
  }
}

fn fmt_code(code: Option<i32>) -> String {
  code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn fmt_progress(sent: Option<usize>, total: usize) -> String {
  match sent {
    Some(sent) => format!("{} of {} files sent", sent, total),
    None => format!("interrupted while sending {} file(s)", total),
  }
}

fn fmt_stderr(stderr: &str) -> String {
  let trimmed = stderr.trim();
  if trimmed.is_empty() {
    String::new()
  } else {
    format!(": {}", trimmed)
  }
}
