//! The release checksum manifest.
//!
//! Rendered in the format `sha256sum` reads and writes, one `<digest>  <path>` line per
//! file in byte order of the path, so `sha256sum -c manifest.sha256` run inside an
//! unpacked update tree checks it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::util::hash::{ContentHash, HashError, hash_tree};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
  #[error("manifest line {line}: expected '<sha256>  <path>'")]
  Malformed { line: usize },

  #[error("manifest line {line}: '{digest}' is not a sha256 digest")]
  BadDigest { line: usize, digest: String },

  #[error("manifest line {line}: '{path}' listed twice")]
  Duplicate { line: usize, path: String },
}

/// Relative path to SHA-256 digest, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReleaseManifest {
  entries: BTreeMap<String, ContentHash>,
}

/// Differences between a manifest and the files actually present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
  /// Listed but absent.
  pub missing: Vec<String>,
  /// Present but not listed.
  pub extra: Vec<String>,
  /// Present with a different digest.
  pub mismatched: Vec<String>,
}

impl ManifestDiff {
  pub fn is_empty(&self) -> bool {
    self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
  }
}

impl ReleaseManifest {
  pub fn new(entries: BTreeMap<String, ContentHash>) -> Self {
    Self { entries }
  }

  /// Digest every regular file below `root`, leaving out the manifest file itself.
  pub fn from_tree(root: &Path, manifest_name: &str) -> Result<Self, HashError> {
    Ok(Self::new(hash_tree(root, &[manifest_name])?))
  }

  pub fn entries(&self) -> &BTreeMap<String, ContentHash> {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, path: &str) -> Option<&ContentHash> {
    self.entries.get(path)
  }

  pub fn render(&self) -> String {
    let mut out = String::new();
    for (path, digest) in &self.entries {
      out.push_str(&digest.0);
      out.push_str("  ");
      out.push_str(path);
      out.push('\n');
    }
    out
  }

  pub fn parse(content: &str) -> Result<Self, ManifestError> {
    let mut entries = BTreeMap::new();

    for (index, raw) in content.lines().enumerate() {
      let line = index + 1;
      if raw.trim().is_empty() {
        continue;
      }

      // sha256sum marks binary-mode entries with '*' instead of the second space.
      let (digest, path) = raw
        .split_once("  ")
        .or_else(|| raw.split_once(" *"))
        .ok_or(ManifestError::Malformed { line })?;

      if !ContentHash::is_well_formed(digest) {
        return Err(ManifestError::BadDigest {
          line,
          digest: digest.to_string(),
        });
      }
      if path.is_empty() {
        return Err(ManifestError::Malformed { line });
      }

      if entries
        .insert(path.to_string(), ContentHash(digest.to_string()))
        .is_some()
      {
        return Err(ManifestError::Duplicate {
          line,
          path: path.to_string(),
        });
      }
    }

    Ok(Self::new(entries))
  }

  /// Compare the manifest against the digests of what is actually there.
  pub fn diff(&self, actual: &BTreeMap<String, ContentHash>) -> ManifestDiff {
    let mut diff = ManifestDiff::default();

    for (path, expected) in &self.entries {
      match actual.get(path) {
        None => diff.missing.push(path.clone()),
        Some(found) if found != expected => diff.mismatched.push(path.clone()),
        Some(_) => {}
      }
    }
    diff.extra = actual
      .keys()
      .filter(|path| !self.entries.contains_key(*path))
      .cloned()
      .collect();

    diff
  }
}
