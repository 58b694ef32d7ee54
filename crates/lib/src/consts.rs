//! Crate-wide constants.

/// Configuration file looked up in the workspace root when none is given explicitly.
pub const CONFIG_FILENAME: &str = "fltrel.toml";

/// Environment variable overriding the workspace root.
pub const WORKSPACE_ENV: &str = "FLTREL_WORKSPACE";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "FLTREL_CONFIG";

/// Embedded target every service is cross-compiled for unless configured otherwise.
pub const DEFAULT_TRIPLE: &str = "armv5te-unknown-linux-uclibceabi";

/// Stack/heap reservation written into every FLT header (64 KiB).
pub const DEFAULT_RESERVED_SIZE: u32 = 0x10000;

/// The services shipped in a release, in build order.
pub const DEFAULT_SERVICES: [&str; 4] = ["file-service", "scheduler-service", "shell-service", "telemetry-service"];

/// Install directory for services inside the update tree.
pub const DEFAULT_INSTALL_DIR: &str = "usr/sbin";

/// Timestamp stamped on every archive entry: 1980-01-01T00:00:00Z (ZIP epoch).
pub const SOURCE_DATE_EPOCH: u64 = 315532800;

/// Owner name recorded for every archive entry.
pub const ARCHIVE_OWNER: &str = "root";
