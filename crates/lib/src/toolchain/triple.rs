use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigurationError;

/// A cross-compilation target such as `armv5te-unknown-linux-uclibceabi`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetTriple(String);

impl TargetTriple {
  /// Validate an `arch-vendor-os[-abi]` tuple.
  pub fn parse(triple: &str) -> Result<Self, ConfigurationError> {
    let invalid = |reason: &str| ConfigurationError::InvalidTriple {
      triple: triple.to_string(),
      reason: reason.to_string(),
    };

    let parts: Vec<&str> = triple.split('-').collect();
    if !(3..=4).contains(&parts.len()) {
      return Err(invalid("expected arch-vendor-os or arch-vendor-os-abi"));
    }
    if parts.iter().any(|p| p.is_empty()) {
      return Err(invalid("empty component"));
    }
    if !triple
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
      return Err(invalid("only lowercase letters, digits, '_' and '.' are allowed"));
    }

    Ok(Self(triple.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The CPU architecture component (e.g. `armv5te`).
  pub fn arch(&self) -> &str {
    self.0.split('-').next().unwrap_or_default()
  }

  /// Variable cargo reads the linker from: `CARGO_TARGET_<TRIPLE>_LINKER`.
  pub fn linker_env_key(&self) -> String {
    format!("CARGO_TARGET_{}_LINKER", self.0.to_ascii_uppercase().replace(['-', '.'], "_"))
  }

  /// Variable cc-based build scripts read the C compiler from: `CC_<triple>`.
  pub fn cc_env_key(&self) -> String {
    format!("CC_{}", self.0.replace('-', "_"))
  }
}

impl fmt::Display for TargetTriple {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl TryFrom<String> for TargetTriple {
  type Error = ConfigurationError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<TargetTriple> for String {
  fn from(triple: TargetTriple) -> Self {
    triple.0
  }
}
