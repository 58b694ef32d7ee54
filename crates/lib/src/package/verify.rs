//! Integrity check of a produced release archive.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::Serialize;
use tar::Archive;
use tracing::{debug, info};

use super::manifest::{ManifestDiff, ReleaseManifest};
use super::types::{PackagingError, ReleaseArchive};
use crate::consts::SOURCE_DATE_EPOCH;
use crate::util::hash::{ContentHash, hash_file, hash_reader};

/// Outcome of [`verify_archive`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
  pub archive: PathBuf,
  pub sha256: ContentHash,
  pub manifest: ReleaseManifest,
  pub diff: ManifestDiff,
  /// Entries whose owner or mtime is not the normalized value.
  pub unnormalized: Vec<String>,
}

impl VerifyReport {
  pub fn is_clean(&self) -> bool {
    self.diff.is_empty() && self.unnormalized.is_empty()
  }

  /// Number of entries that are missing, extra, altered or not normalized.
  pub fn problems(&self) -> usize {
    self.diff.missing.len() + self.diff.extra.len() + self.diff.mismatched.len() + self.unnormalized.len()
  }
}

impl ReleaseArchive {
  /// Reopen an archive produced by an earlier run, so it can be shipped again without
  /// repackaging. The archive must still match its embedded manifest.
  pub fn open(path: &Path, manifest_name: &str) -> Result<Self, PackagingError> {
    let report = verify_archive(path, manifest_name)?;
    if !report.is_clean() {
      return Err(PackagingError::Unverified {
        archive: path.to_path_buf(),
        problems: report.problems(),
      });
    }

    let size = fs::metadata(path).map_err(|e| PackagingError::io(path, e))?.len();
    Ok(Self {
      path: report.archive,
      sha256: report.sha256,
      size,
      manifest: report.manifest,
    })
  }
}

fn entry_name(raw: &Path) -> String {
  let name = raw.to_string_lossy();
  name.trim_start_matches("./").trim_end_matches('/').to_string()
}

/// Recompute the digest of every file in `archive` and compare with its embedded manifest.
pub fn verify_archive(archive: &Path, manifest_name: &str) -> Result<VerifyReport, PackagingError> {
  let io_err = |e| PackagingError::io(archive, e);

  let file = File::open(archive).map_err(io_err)?;
  let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));

  let mut manifest_text = None;
  let mut actual = BTreeMap::new();
  let mut unnormalized = Vec::new();

  for entry in tar.entries().map_err(io_err)? {
    let mut entry = entry.map_err(io_err)?;
    let name = entry_name(&entry.path().map_err(io_err)?);

    let header = entry.header();
    let normalized = header.uid().ok() == Some(0)
      && header.gid().ok() == Some(0)
      && header.mtime().ok() == Some(SOURCE_DATE_EPOCH);
    if !normalized {
      unnormalized.push(name.clone());
    }

    if !header.entry_type().is_file() {
      continue;
    }

    if name == manifest_name {
      let mut text = String::new();
      entry.read_to_string(&mut text).map_err(io_err)?;
      manifest_text = Some(text);
    } else {
      let digest = hash_reader(&mut entry).map_err(io_err)?;
      debug!(path = %name, %digest, "hashed entry");
      actual.insert(name, digest);
    }
  }

  let text = manifest_text.ok_or_else(|| PackagingError::MissingManifest {
    archive: archive.to_path_buf(),
    name: manifest_name.to_string(),
  })?;
  let manifest = ReleaseManifest::parse(&text).map_err(|e| PackagingError::Manifest {
    archive: archive.to_path_buf(),
    source: e,
  })?;

  let diff = manifest.diff(&actual);
  let report = VerifyReport {
    archive: archive.to_path_buf(),
    sha256: hash_file(archive)?,
    manifest,
    diff,
    unnormalized,
  };

  info!(
    archive = %archive.display(),
    entries = report.manifest.len(),
    clean = report.is_clean(),
    "verified"
  );
  Ok(report)
}
