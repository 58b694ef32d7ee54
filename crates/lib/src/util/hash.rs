//! Hashing utilities for release manifests and archive verification.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hex digest
//! - `hash_tree()`: Per-file digests of a directory, keyed by sorted relative path
//! - `hash_file()`: Single file hashing
//! - `hash_reader()`: Hashing of any byte stream (archive entries)
//! - `hash_bytes()`: Arbitrary byte hashing

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// A full 64-character SHA-256 hash for content verification.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ContentHash {
  /// Whether the string looks like a SHA-256 hex digest.
  pub fn is_well_formed(digest: &str) -> bool {
    digest.len() == 64 && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
  }
}

/// Error during file or tree hashing.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to walk directory {path}: {source}")]
  WalkDir {
    path: String,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read file {path}: {source}")]
  ReadFile {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("path is not valid UTF-8: {0}")]
  NonUtf8Path(String),
}

/// Compute the digest of every regular file below `root`.
///
/// Keys are paths relative to `root` joined with `/` regardless of host platform, so the
/// result is identical on every machine. Directories are walked recursively; symlinks and
/// special files are skipped. Top-level entries named in `exclude` are ignored.
///
/// # Example
///
/// ```ignore
/// let digests = hash_tree(&staging_root, &["manifest.sha256"])?;
/// ```
pub fn hash_tree(root: &Path, exclude: &[&str]) -> Result<BTreeMap<String, ContentHash>, HashError> {
  let mut entries = BTreeMap::new();

  let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
    e.depth() != 1
      || e
        .file_name()
        .to_str()
        .map(|name| !exclude.contains(&name))
        .unwrap_or(true)
  });

  for entry in walker {
    let entry = entry.map_err(|e| HashError::WalkDir {
      path: root.display().to_string(),
      source: e,
    })?;

    if !entry.file_type().is_file() {
      continue;
    }

    let rel_path = relative_key(root, entry.path())?;
    entries.insert(rel_path, hash_file(entry.path())?);
  }

  Ok(entries)
}

/// Build the `/`-separated key for `path` relative to `root`.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, HashError> {
  let rel = path.strip_prefix(root).unwrap_or(path);
  let mut parts = Vec::new();
  for component in rel.components() {
    let part = component
      .as_os_str()
      .to_str()
      .ok_or_else(|| HashError::NonUtf8Path(path.display().to_string()))?;
    parts.push(part);
  }
  Ok(parts.join("/"))
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA-256 hash of the file.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let file = fs::File::open(path).map_err(|e| HashError::ReadFile {
    path: path.display().to_string(),
    source: e,
  })?;

  hash_reader(file).map_err(|e| HashError::ReadFile {
    path: path.display().to_string(),
    source: e,
  })
}

/// Hash everything readable from `reader`.
pub fn hash_reader(mut reader: impl Read) -> std::io::Result<ContentHash> {
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = reader.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
///
/// Returns the full 64-character SHA-256 hash.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}
