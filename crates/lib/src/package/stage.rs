//! Staging of stamped binaries into an update tree.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::types::PackagingError;
use crate::build::BuildArtifact;
use crate::stamp::flt::FltHeader;
use crate::util::fs::{is_executable, set_mode};

/// Check an install path: relative, `/`-separated, and confined to the tree.
pub fn validate_install_path(artifact: &str, install_path: &str, manifest_name: &str) -> Result<PathBuf, PackagingError> {
  let invalid = |reason: &str| PackagingError::InvalidLayout {
    artifact: artifact.to_string(),
    path: install_path.to_string(),
    reason: reason.to_string(),
  };

  if install_path.is_empty() {
    return Err(invalid("empty path"));
  }
  if install_path.contains('\\') {
    return Err(invalid("must use '/' separators"));
  }
  if install_path.chars().any(char::is_control) {
    return Err(invalid("contains control characters"));
  }

  let path = Path::new(install_path);
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::Normal(part) => normalized.push(part),
      Component::CurDir => {}
      Component::ParentDir => return Err(invalid("escapes the update tree")),
      Component::RootDir | Component::Prefix(_) => return Err(invalid("must be relative")),
    }
  }

  if normalized.as_os_str().is_empty() {
    return Err(invalid("empty path"));
  }
  if normalized == Path::new(manifest_name) {
    return Err(invalid("collides with the manifest"));
  }
  Ok(normalized)
}

/// Pick the artifact for every layout entry, checking it is stamped with `reserved_size`
/// both in memory and on disk.
pub fn select_artifacts<'a>(
  artifacts: &'a [BuildArtifact],
  layout: &BTreeMap<String, String>,
  reserved_size: u32,
) -> Result<Vec<(&'a BuildArtifact, &'a str)>, PackagingError> {
  let mut selected = Vec::with_capacity(layout.len());

  for name in layout.keys() {
    let artifact = artifacts
      .iter()
      .find(|a| a.target == *name)
      .ok_or_else(|| PackagingError::incomplete(name, "no artifact was built"))?;

    match artifact.stamped {
      None => return Err(PackagingError::incomplete(name, "not stamped")),
      Some(size) if size != reserved_size => {
        return Err(PackagingError::incomplete(
          name,
          format!("stamped with {:#x}, expected {:#x}", size, reserved_size),
        ));
      }
      Some(_) => {}
    }

    let header = FltHeader::read_from(&artifact.path)
      .map_err(|e| PackagingError::incomplete(name, format!("{}: {}", artifact.path.display(), e)))?;
    if header.stack_size != reserved_size {
      return Err(PackagingError::incomplete(
        name,
        format!(
          "{} records stack size {:#x}, expected {:#x}",
          artifact.path.display(),
          header.stack_size,
          reserved_size
        ),
      ));
    }

    selected.push((artifact, artifact.target.as_str()));
  }

  let unlisted: Vec<&str> = artifacts
    .iter()
    .map(|a| a.target.as_str())
    .filter(|t| !layout.contains_key(*t))
    .collect();
  if !unlisted.is_empty() {
    warn!(artifacts = ?unlisted, "artifacts without a layout entry are not packaged");
  }

  Ok(selected)
}

/// Copy every laid-out artifact into `root` at its install path.
///
/// Returns the staged paths keyed by target name.
pub fn stage(
  root: &Path,
  artifacts: &[BuildArtifact],
  layout: &BTreeMap<String, String>,
  reserved_size: u32,
  manifest_name: &str,
) -> Result<BTreeMap<String, PathBuf>, PackagingError> {
  let mut install_paths = Vec::with_capacity(layout.len());
  let mut seen = HashSet::new();
  for (name, install_path) in layout {
    let rel = validate_install_path(name, install_path, manifest_name)?;
    if !seen.insert(rel.clone()) {
      return Err(PackagingError::InvalidLayout {
        artifact: name.clone(),
        path: install_path.clone(),
        reason: "used by more than one artifact".to_string(),
      });
    }
    install_paths.push((name.as_str(), rel));
  }

  let selected = select_artifacts(artifacts, layout, reserved_size)?;

  let mut staged = BTreeMap::new();
  for ((artifact, name), (_, rel)) in selected.into_iter().zip(install_paths) {
    let dest = root.join(&rel);
    if let Some(parent) = dest.parent() {
      fs::create_dir_all(parent).map_err(|e| PackagingError::io(parent, e))?;
    }

    fs::copy(&artifact.path, &dest).map_err(|e| PackagingError::io(&artifact.path, e))?;

    let meta = fs::metadata(&dest).map_err(|e| PackagingError::io(&dest, e))?;
    let mode = if is_executable(&meta) { 0o755 } else { 0o644 };
    set_mode(&dest, mode).map_err(|e| PackagingError::io(&dest, e))?;

    debug!(service = name, path = %rel.display(), "staged");
    staged.insert(name.to_string(), dest);
  }

  Ok(staged)
}
