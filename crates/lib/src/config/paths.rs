//! Location of the workspace root and the configuration file.

use std::path::{Path, PathBuf};

use crate::consts::{CONFIG_ENV, CONFIG_FILENAME, WORKSPACE_ENV};

use super::ConfigurationError;

/// Returns the workspace root.
///
/// Precedence: the explicit argument, then `FLTREL_WORKSPACE`, then the current directory.
/// The result is canonicalized and must be an existing directory.
pub fn workspace_root(explicit: Option<&Path>) -> Result<PathBuf, ConfigurationError> {
  let candidate = match explicit {
    Some(path) => path.to_path_buf(),
    None => match std::env::var_os(WORKSPACE_ENV) {
      Some(value) if !value.is_empty() => PathBuf::from(value),
      _ => std::env::current_dir().map_err(ConfigurationError::CurrentDir)?,
    },
  };

  let root = dunce::canonicalize(&candidate).map_err(|_| ConfigurationError::WorkspaceNotFound(candidate.clone()))?;
  if !root.is_dir() {
    return Err(ConfigurationError::WorkspaceNotFound(candidate));
  }
  Ok(root)
}

/// Returns the configuration file to load, if any.
///
/// Precedence: the explicit argument, then `FLTREL_CONFIG`, then `<workspace>/fltrel.toml`
/// when it exists. Explicit and environment paths are returned even if missing so the
/// caller reports them; the workspace default is optional.
pub fn config_path(explicit: Option<&Path>, workspace: &Path) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }
  if let Some(value) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
    return Some(PathBuf::from(value));
  }
  let default = workspace.join(CONFIG_FILENAME);
  default.is_file().then_some(default)
}
