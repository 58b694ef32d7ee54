//! Toolchain resolution.
//!
//! Turns the `[toolchain]` layout into absolute, validated paths for the cross-compiler,
//! cross-linker, FLT header stamper, and target standard-library sources. Resolution only
//! reads the filesystem, so calling it twice with the same inputs gives the same answer.

mod triple;

pub use triple::TargetTriple;

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigurationError;
use crate::util::fs::is_executable;

/// Which toolchain path a check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRole {
  Compiler,
  Linker,
  Stamper,
  StdSource,
}

impl fmt::Display for ToolRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Compiler => "cross-compiler",
      Self::Linker => "cross-linker",
      Self::Stamper => "header stamper",
      Self::StdSource => "standard library sources",
    };
    f.write_str(name)
  }
}

/// `[toolchain]`: where the tools live, relative to the workspace root.
///
/// Tool names are joined onto `bin_dir`; an absolute tool path is used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToolchainLayout {
  pub bin_dir: PathBuf,
  pub compiler: String,
  pub linker: String,
  pub stamper: String,
  pub std_src: PathBuf,
}

impl Default for ToolchainLayout {
  fn default() -> Self {
    Self {
      bin_dir: PathBuf::from("toolchains/iobc/usr/bin"),
      compiler: "arm-linux-gcc".to_string(),
      linker: "arm-linux-gcc".to_string(),
      stamper: "flthdr".to_string(),
      std_src: PathBuf::from("third-party/rust-std"),
    }
  }
}

/// Resolved toolchain paths. Read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainConfig {
  pub workspace_root: PathBuf,
  pub compiler: PathBuf,
  pub linker: PathBuf,
  pub stamper: PathBuf,
  pub std_src: PathBuf,
}

impl ToolchainConfig {
  /// Resolve and validate every path, failing on the first bad one.
  ///
  /// Checked in order: compiler, linker, stamper (must be executable files), then the
  /// standard library source root (must be a readable directory).
  pub fn resolve(workspace_root: &Path, layout: &ToolchainLayout) -> Result<Self, ConfigurationError> {
    let root = dunce::canonicalize(workspace_root)
      .map_err(|_| ConfigurationError::WorkspaceNotFound(workspace_root.to_path_buf()))?;
    let bin_dir = root.join(&layout.bin_dir);

    let compiler = check_tool(ToolRole::Compiler, bin_dir.join(&layout.compiler))?;
    let linker = check_tool(ToolRole::Linker, bin_dir.join(&layout.linker))?;
    let stamper = check_tool(ToolRole::Stamper, bin_dir.join(&layout.stamper))?;
    let std_src = check_dir(ToolRole::StdSource, root.join(&layout.std_src))?;

    debug!(
      compiler = %compiler.display(),
      linker = %linker.display(),
      stamper = %stamper.display(),
      std_src = %std_src.display(),
      "toolchain resolved"
    );

    Ok(Self {
      workspace_root: root,
      compiler,
      linker,
      stamper,
      std_src,
    })
  }

  /// Environment injected into a single cross-compilation child process.
  pub fn cross_env(&self, triple: &TargetTriple) -> BTreeMap<String, OsString> {
    let mut env = BTreeMap::new();
    env.insert(triple.cc_env_key(), self.compiler.clone().into_os_string());
    env.insert(triple.linker_env_key(), self.linker.clone().into_os_string());
    env.insert("PKG_CONFIG_ALLOW_CROSS".to_string(), OsString::from("1"));
    env.insert("RUST_TARGET_PATH".to_string(), self.workspace_root.clone().into_os_string());
    env.insert("XARGO_RUST_SRC".to_string(), self.std_src.clone().into_os_string());
    env
  }
}

fn check_tool(role: ToolRole, path: PathBuf) -> Result<PathBuf, ConfigurationError> {
  let meta = metadata(role, &path)?;
  if !meta.is_file() || !is_executable(&meta) {
    return Err(ConfigurationError::NotExecutable { role, path });
  }
  Ok(path)
}

fn check_dir(role: ToolRole, path: PathBuf) -> Result<PathBuf, ConfigurationError> {
  let meta = metadata(role, &path)?;
  if !meta.is_dir() {
    return Err(ConfigurationError::Unreadable {
      role,
      path,
      source: io::Error::other("not a directory"),
    });
  }
  if let Err(source) = fs::read_dir(&path) {
    return Err(ConfigurationError::Unreadable { role, path, source });
  }
  Ok(path)
}

fn metadata(role: ToolRole, path: &Path) -> Result<fs::Metadata, ConfigurationError> {
  fs::metadata(path).map_err(|e| match e.kind() {
    io::ErrorKind::NotFound => ConfigurationError::MissingPath {
      role,
      path: path.to_path_buf(),
    },
    _ => ConfigurationError::Unreadable {
      role,
      path: path.to_path_buf(),
      source: e,
    },
  })
}
