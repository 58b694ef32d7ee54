//! Release packaging.
//!
//! Turns a set of stamped artifacts into an update bundle:
//!
//! 1. Every layout entry is matched to a stamped artifact ([`stage::select_artifacts`]).
//! 2. The artifacts are copied into a private staging tree at their install paths.
//! 3. A sha256sum-style manifest of the staged files is written into the tree root.
//! 4. The tree is written as a deterministic tar.gz to a temporary file next to the
//!    final archive path, then renamed into place.
//!
//! Nothing is left at the archive path unless every step succeeded.
//!
//! # Submodules
//!
//! - [`archive`] - Deterministic tar.gz writer
//! - [`manifest`] - Checksum manifest rendering, parsing and comparison
//! - [`stage`] - Layout validation and staging
//! - [`verify`] - Archive integrity checks

pub mod archive;
pub mod manifest;
pub mod stage;
mod types;
pub mod verify;

pub use manifest::{ManifestDiff, ManifestError, ReleaseManifest};
pub use types::*;
pub use verify::{VerifyReport, verify_archive};

use std::collections::BTreeMap;
use std::fs;

use tracing::info;

use crate::build::BuildArtifact;
use crate::util::fs::temp_sibling;
use crate::util::hash::hash_file;

/// Package stamped artifacts laid out by `layout` (target name to install path).
pub fn package(
  artifacts: &[BuildArtifact],
  layout: &BTreeMap<String, String>,
  options: &PackageOptions,
) -> Result<ReleaseArchive, PackagingError> {
  if layout.is_empty() {
    return Err(PackagingError::incomplete("<layout>", "no artifacts to package"));
  }

  let output_dir = &options.output_dir;
  fs::create_dir_all(output_dir).map_err(|e| PackagingError::io(output_dir, e))?;

  let staging = tempfile::Builder::new()
    .prefix(".fltrel-stage-")
    .tempdir_in(output_dir)
    .map_err(|e| PackagingError::io(output_dir, e))?;
  let root = staging.path();

  stage::stage(root, artifacts, layout, options.reserved_size, &options.manifest_name)?;

  let manifest = ReleaseManifest::from_tree(root, &options.manifest_name)?;
  let manifest_path = root.join(&options.manifest_name);
  fs::write(&manifest_path, manifest.render()).map_err(|e| PackagingError::io(&manifest_path, e))?;
  crate::util::fs::set_mode(&manifest_path, 0o644).map_err(|e| PackagingError::io(&manifest_path, e))?;

  let archive_path = options.archive_path();
  let tmp = temp_sibling(&archive_path).map_err(|e| PackagingError::io(&archive_path, e))?;
  archive::write_tree(root, tmp.as_file())?;
  tmp
    .as_file()
    .sync_all()
    .map_err(|e| PackagingError::io(tmp.path(), e))?;

  let sha256 = hash_file(tmp.path())?;
  let size = tmp
    .as_file()
    .metadata()
    .map_err(|e| PackagingError::io(tmp.path(), e))?
    .len();

  tmp
    .persist(&archive_path)
    .map_err(|e| PackagingError::io(&archive_path, e.error))?;

  info!(
    archive = %archive_path.display(),
    files = manifest.len(),
    size,
    sha256 = %sha256,
    "packaged"
  );

  Ok(ReleaseArchive {
    path: archive_path,
    sha256,
    size,
    manifest,
  })
}
