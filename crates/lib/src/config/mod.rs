//! Pipeline configuration.
//!
//! Read once from `fltrel.toml` (or built-in defaults) into an immutable
//! [`PipelineConfig`] that is handed to each stage explicitly.
//!
//! # Example
//!
//! ```toml
//! triple = "armv5te-unknown-linux-uclibceabi"
//! mode = "release"
//! reserved_size = 0x10000
//!
//! [toolchain]
//! bin_dir = "toolchains/iobc/usr/bin"
//! compiler = "arm-linux-gcc"
//!
//! [[targets]]
//! name = "file-service"
//! install_path = "usr/sbin/file-service"
//! ```

pub mod paths;

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::build::{BuildMode, BuildTarget};
use crate::consts::{DEFAULT_INSTALL_DIR, DEFAULT_RESERVED_SIZE, DEFAULT_SERVICES, DEFAULT_TRIPLE};
use crate::deploy::TransferTools;
use crate::toolchain::{TargetTriple, ToolRole, ToolchainLayout};

/// Errors raised before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigurationError {
  #[error("workspace root not found: {}", .0.display())]
  WorkspaceNotFound(PathBuf),

  #[error("cannot determine current directory: {0}")]
  CurrentDir(#[source] io::Error),

  #[error("failed to read config {}: {source}", path.display())]
  ReadConfig {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse config {}: {source}", path.display())]
  ParseConfig {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },

  #[error("invalid configuration: {0}")]
  Invalid(String),

  #[error("invalid target triple '{triple}': {reason}")]
  InvalidTriple { triple: String, reason: String },

  #[error("unknown build target '{0}'")]
  UnknownTarget(String),

  #[error("build target '{0}' listed more than once")]
  DuplicateTarget(String),

  #[error("{role} not found: {}", path.display())]
  MissingPath { role: ToolRole, path: PathBuf },

  #[error("{role} is not executable: {}", path.display())]
  NotExecutable { role: ToolRole, path: PathBuf },

  #[error("{role} is not readable: {}: {source}", path.display())]
  Unreadable {
    role: ToolRole,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// One `[[targets]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
  /// Workspace package name, also the output binary name.
  pub name: String,

  /// Path inside the update tree. Defaults to `usr/sbin/<name>`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub install_path: Option<String>,
}

impl TargetEntry {
  fn to_target(&self) -> BuildTarget {
    let install_path = self
      .install_path
      .clone()
      .unwrap_or_else(|| format!("{}/{}", DEFAULT_INSTALL_DIR, self.name));
    BuildTarget::new(&self.name, install_path)
  }
}

/// `[build]`: how the cross-compilation step is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BuildSettings {
  /// Program invoked as `<cargo> build --target ...`.
  pub cargo: String,
  /// Directory the build runs in, relative to the workspace root.
  pub source_dir: PathBuf,
  /// Pinned `CARGO_TARGET_DIR`, relative to the workspace root.
  pub target_dir: PathBuf,
}

impl Default for BuildSettings {
  fn default() -> Self {
    Self {
      cargo: "cargo".to_string(),
      source_dir: PathBuf::from("."),
      target_dir: PathBuf::from("target"),
    }
  }
}

/// `[release]`: where and how the archive is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReleaseSettings {
  pub output_dir: PathBuf,
  pub archive_name: String,
  pub manifest_name: String,
}

impl Default for ReleaseSettings {
  fn default() -> Self {
    Self {
      output_dir: PathBuf::from("release"),
      archive_name: "update.tar.gz".to_string(),
      manifest_name: "manifest.sha256".to_string(),
    }
  }
}

/// The whole `fltrel.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
  pub triple: String,
  pub mode: BuildMode,
  pub reserved_size: u32,
  pub toolchain: ToolchainLayout,
  pub build: BuildSettings,
  pub release: ReleaseSettings,
  pub deploy: TransferTools,
  pub targets: Vec<TargetEntry>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      triple: DEFAULT_TRIPLE.to_string(),
      mode: BuildMode::Release,
      reserved_size: DEFAULT_RESERVED_SIZE,
      toolchain: ToolchainLayout::default(),
      build: BuildSettings::default(),
      release: ReleaseSettings::default(),
      deploy: TransferTools::default(),
      targets: DEFAULT_SERVICES
        .iter()
        .map(|name| TargetEntry {
          name: name.to_string(),
          install_path: None,
        })
        .collect(),
    }
  }
}

impl PipelineConfig {
  /// Parse and validate a configuration document.
  pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
    let config: Self = toml::from_str(content).map_err(|e| ConfigurationError::ParseConfig {
      path: origin.to_path_buf(),
      source: Box::new(e),
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Load the configuration file if there is one, built-in defaults otherwise.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
    let Some(path) = path else {
      debug!("no config file, using defaults");
      return Ok(Self::default());
    };

    debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::ReadConfig {
      path: path.to_path_buf(),
      source: e,
    })?;
    Self::from_toml(&content, path)
  }

  /// Check invariants serde can't express.
  pub fn validate(&self) -> Result<(), ConfigurationError> {
    self.target_triple()?;

    if self.reserved_size == 0 {
      return Err(ConfigurationError::Invalid("reserved_size must be non-zero".into()));
    }
    if self.targets.is_empty() {
      return Err(ConfigurationError::Invalid("at least one [[targets]] entry is required".into()));
    }

    let mut seen = HashSet::new();
    for entry in &self.targets {
      if entry.name.is_empty() || entry.name.contains(['/', '\\']) {
        return Err(ConfigurationError::Invalid(format!("invalid target name '{}'", entry.name)));
      }
      if !seen.insert(entry.name.as_str()) {
        return Err(ConfigurationError::DuplicateTarget(entry.name.clone()));
      }
    }

    let manifest = &self.release.manifest_name;
    if manifest.is_empty() || manifest.contains(['/', '\\']) {
      return Err(ConfigurationError::Invalid(format!("invalid manifest name '{}'", manifest)));
    }
    if self.targets.iter().any(|t| t.to_target().install_path == *manifest) {
      return Err(ConfigurationError::Invalid(format!(
        "manifest name '{}' collides with an install path",
        manifest
      )));
    }
    if self.release.archive_name.is_empty() || self.release.archive_name.contains(['/', '\\']) {
      return Err(ConfigurationError::Invalid(format!(
        "invalid archive name '{}'",
        self.release.archive_name
      )));
    }

    Ok(())
  }

  pub fn target_triple(&self) -> Result<TargetTriple, ConfigurationError> {
    TargetTriple::parse(&self.triple)
  }

  /// Every configured target, in configuration order.
  pub fn targets(&self) -> Vec<BuildTarget> {
    self.targets.iter().map(TargetEntry::to_target).collect()
  }

  /// Resolve a requested target list against the configuration.
  ///
  /// An empty request selects every configured target in configuration order. Otherwise
  /// the request order is kept as given.
  pub fn select_targets<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<BuildTarget>, ConfigurationError> {
    if names.is_empty() {
      return Ok(self.targets());
    }

    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
      let name = name.as_ref();
      if !seen.insert(name) {
        return Err(ConfigurationError::DuplicateTarget(name.to_string()));
      }
      let entry = self
        .targets
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| ConfigurationError::UnknownTarget(name.to_string()))?;
      selected.push(entry.to_target());
    }
    Ok(selected)
  }

  /// Map from target name to install path for the given targets.
  pub fn stage_layout(targets: &[BuildTarget]) -> BTreeMap<String, String> {
    targets
      .iter()
      .map(|t| (t.name.clone(), t.install_path.clone()))
      .collect()
  }
}
