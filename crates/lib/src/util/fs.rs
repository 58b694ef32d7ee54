//! Filesystem helpers shared by the stamping and packaging stages.

use std::fs::Metadata;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Whether any execute bit is set.
#[cfg(unix)]
pub fn is_executable(meta: &Metadata) -> bool {
  use std::os::unix::fs::PermissionsExt;
  meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
pub fn is_executable(meta: &Metadata) -> bool {
  meta.is_file()
}

/// Set the permission bits of `path`. No-op where modes don't exist.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
  Ok(())
}

/// Create a hidden temporary file next to `path`.
///
/// The file lives in the same directory so a later `persist` is a same-filesystem
/// rename. It is deleted on drop unless persisted.
pub fn temp_sibling(path: &Path) -> io::Result<NamedTempFile> {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent,
    _ => Path::new("."),
  };
  let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

  tempfile::Builder::new()
    .prefix(&format!(".{}.", name))
    .suffix(".tmp")
    .tempfile_in(dir)
}
