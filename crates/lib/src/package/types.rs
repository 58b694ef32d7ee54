//! Types for the packaging stage.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::manifest::{ManifestError, ReleaseManifest};
use crate::util::hash::{ContentHash, HashError};

/// Where and how the release archive is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
  /// Directory the archive is written to. Created if missing.
  pub output_dir: PathBuf,
  pub archive_name: String,
  /// File name of the checksum manifest placed at the root of the update tree.
  pub manifest_name: String,
  /// Stack size every packaged binary must carry in its FLT header.
  pub reserved_size: u32,
}

impl PackageOptions {
  pub fn archive_path(&self) -> PathBuf {
    self.output_dir.join(&self.archive_name)
  }
}

/// A finished update bundle. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseArchive {
  pub path: PathBuf,
  /// Digest of the compressed archive file itself.
  pub sha256: ContentHash,
  pub size: u64,
  pub manifest: ReleaseManifest,
}

#[derive(Debug, Error)]
pub enum PackagingError {
  /// A layout entry has no usable artifact behind it.
  #[error("incomplete artifact set: {artifact}: {reason}")]
  IncompleteArtifactSet { artifact: String, reason: String },

  #[error("invalid install path '{path}' for {artifact}: {reason}")]
  InvalidLayout {
    artifact: String,
    path: String,
    reason: String,
  },

  #[error("{}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Hash(#[from] HashError),

  #[error("{}: {source}", archive.display())]
  Manifest {
    archive: PathBuf,
    #[source]
    source: ManifestError,
  },

  #[error("{}: archive has no {name}", archive.display())]
  MissingManifest { archive: PathBuf, name: String },

  /// An existing archive no longer matches its embedded manifest.
  #[error("{}: does not match its manifest ({problems} problem(s))", archive.display())]
  Unverified { archive: PathBuf, problems: usize },
}

impl PackagingError {
  pub(crate) fn io(path: &Path, source: io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }

  pub(crate) fn incomplete(artifact: &str, reason: impl Into<String>) -> Self {
    Self::IncompleteArtifactSet {
      artifact: artifact.to_string(),
      reason: reason.into(),
    }
  }
}
