//! FLT header stamping.
//!
//! Every service binary must carry the stack/heap reservation in its FLT header before it
//! can be shipped. The external stamper (`flthdr -s <size> <file>`) edits files in place,
//! so it is always pointed at a temporary copy; the copy replaces the original with a
//! rename only after the new header has been read back and checked.

pub mod flt;

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::build::BuildArtifact;
use crate::util::fs::temp_sibling;

use flt::{FltError, FltHeader};

#[derive(Debug, Error)]
pub enum StampError {
  /// The artifact is missing, not writable, or not an FLT binary.
  #[error("{}: invalid artifact: {reason}", path.display())]
  InvalidArtifact { path: PathBuf, reason: String },

  #[error("{}: stamper exited with code {code:?}: {}", path.display(), stderr.trim())]
  ToolFailed {
    path: PathBuf,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to run stamper {}: {source}", tool.display())]
  Spawn {
    tool: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The stamper claimed success but the header does not hold the requested size.
  #[error("{}: header records stack size {found:#x} after stamping, expected {expected:#x}", path.display())]
  Unverified { path: PathBuf, expected: u32, found: u32 },

  #[error("{}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl StampError {
  fn io(path: &Path, source: io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }
}

/// Read the header of `path`, classifying failures the way the stamper reports them.
fn read_header(path: &Path) -> Result<FltHeader, StampError> {
  FltHeader::read_from(path).map_err(|e| match e {
    FltError::Io(source) => StampError::io(path, source),
    other => StampError::InvalidArtifact {
      path: path.to_path_buf(),
      reason: other.to_string(),
    },
  })
}

fn check_artifact(path: &Path) -> Result<FltHeader, StampError> {
  let invalid = |reason: &str| StampError::InvalidArtifact {
    path: path.to_path_buf(),
    reason: reason.to_string(),
  };

  let meta = match std::fs::metadata(path) {
    Ok(meta) => meta,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(invalid("does not exist")),
    Err(e) => return Err(StampError::io(path, e)),
  };
  if !meta.is_file() {
    return Err(invalid("not a regular file"));
  }
  if meta.permissions().readonly() {
    return Err(invalid("not writable"));
  }

  read_header(path)
}

/// Stamp `reserved_size` into the artifact's FLT header.
///
/// Already carrying the requested size is a no-op: the file is not rewritten. On any
/// failure the original file is left exactly as it was.
pub fn stamp(artifact: &BuildArtifact, reserved_size: u32, stamper: &Path) -> Result<BuildArtifact, StampError> {
  let path = &artifact.path;
  let header = check_artifact(path)?;

  if header.stack_size == reserved_size {
    debug!(service = %artifact.target, size = reserved_size, "already stamped");
    return Ok(artifact.clone().with_stamp(reserved_size));
  }

  let tmp = temp_sibling(path).map_err(|e| StampError::io(path, e))?;
  std::fs::copy(path, tmp.path()).map_err(|e| StampError::io(path, e))?;

  let size_arg = format!("{:#x}", reserved_size);
  debug!(tool = %stamper.display(), size = %size_arg, file = %tmp.path().display(), "spawning stamper");

  let output = Command::new(stamper)
    .arg("-s")
    .arg(&size_arg)
    .arg(tmp.path())
    .output()
    .map_err(|e| StampError::Spawn {
      tool: stamper.to_path_buf(),
      source: e,
    })?;

  if !output.status.success() {
    return Err(StampError::ToolFailed {
      path: path.clone(),
      code: output.status.code(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    });
  }

  let stamped = FltHeader::read_from(tmp.path()).map_err(|e| StampError::InvalidArtifact {
    path: path.clone(),
    reason: format!("stamper produced an unreadable header: {}", e),
  })?;
  if stamped.stack_size != reserved_size {
    return Err(StampError::Unverified {
      path: path.clone(),
      expected: reserved_size,
      found: stamped.stack_size,
    });
  }

  tmp.persist(path).map_err(|e| StampError::io(path, e.error))?;

  info!(
    service = %artifact.target,
    previous = %format!("{:#x}", header.stack_size),
    size = %size_arg,
    "stamped"
  );
  Ok(artifact.clone().with_stamp(reserved_size))
}

/// Stamp every artifact in order, stopping at the first failure.
pub fn stamp_all(artifacts: &[BuildArtifact], reserved_size: u32, stamper: &Path) -> Result<Vec<BuildArtifact>, StampError> {
  artifacts.iter().map(|a| stamp(a, reserved_size, stamper)).collect()
}
