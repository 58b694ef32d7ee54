//! Shared test helpers for CLI integration tests.
//!
//! A [`TestEnv`] is a temporary workspace with the default toolchain layout, shell-script
//! stand-ins for cargo, the header stamper, rsync and curl, and an `fltrel.toml` wiring
//! them together.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const SERVICES: [&str; 4] = ["file-service", "scheduler-service", "shell-service", "telemetry-service"];

const FAKE_CARGO: &str = r#"triple=""; mode=debug; pkg=""
while [ $# -gt 0 ]; do
  case "$1" in
    --target) triple="$2"; shift 2 ;;
    --release) mode=release; shift ;;
    --package) pkg="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$CARGO_TARGET_DIR"
echo "$pkg" >> "$CARGO_TARGET_DIR/build-order.log"
if [ -n "$FAIL_PACKAGE" ] && [ "$pkg" = "$FAIL_PACKAGE" ]; then
  echo "error: could not compile \`$pkg\`" >&2
  exit 101
fi
out="$CARGO_TARGET_DIR/$triple/$mode"
mkdir -p "$out"
{ printf 'bFLT\000\000\000\004'; head -c 56 /dev/zero; printf '%s' "$pkg"; } > "$out/$pkg"
"#;

const FAKE_STAMPER: &str = r#"size=$(($2))
b() { printf "\\$(printf '%03o' $(( (size >> $1) & 255 )))"; }
{ b 24; b 16; b 8; b 0; } | dd of="$3" bs=1 seek=24 count=4 conv=notrunc 2>/dev/null
"#;

const FAKE_RSYNC: &str = r#"if [ -n "$RSYNC_EXIT" ]; then
  echo "rsync: connection unexpectedly closed" >&2
  exit "$RSYNC_EXIT"
fi
for last; do :; done
mkdir -p "$last"
for arg; do
  case "$arg" in
    -*) ;;
    "$last") ;;
    *) cp "$arg" "$last" ;;
  esac
done
"#;

const FAKE_CURL: &str = r#"file=""; url=""
while [ $# -gt 0 ]; do
  case "$1" in
    --upload-file) file="$2"; shift 2 ;;
    -*) shift ;;
    *) url="$1"; shift ;;
  esac
done
echo "$file $url" >> "$CURL_LOG"
"#;

fn write_script(path: &Path, body: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Isolated workspace for one test.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    let toolchain = root.join("toolchains/iobc/usr/bin");
    write_script(&toolchain.join("arm-linux-gcc"), "exit 0\n");
    write_script(&toolchain.join("flthdr"), FAKE_STAMPER);
    fs::create_dir_all(root.join("third-party/rust-std")).unwrap();

    let bin = root.join("bin");
    write_script(&bin.join("cargo"), FAKE_CARGO);
    write_script(&bin.join("rsync"), FAKE_RSYNC);
    write_script(&bin.join("curl"), FAKE_CURL);

    let config = format!(
      r#"[build]
cargo = "{bin}/cargo"

[deploy]
rsync = "{bin}/rsync"
tftp_client = "{bin}/curl"
"#,
      bin = bin.display()
    );
    fs::write(root.join("fltrel.toml"), config).unwrap();

    Self { temp }
  }

  /// Canonical workspace root, as the binary resolves it.
  pub fn root(&self) -> PathBuf {
    dunce::canonicalize(self.temp.path()).unwrap()
  }

  /// A command running in this workspace.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("fltrel");
    cmd
      .env_remove("FLTREL_WORKSPACE")
      .env_remove("FLTREL_CONFIG")
      .env_remove("RUST_LOG")
      .env("CURL_LOG", self.root().join("curl.log"))
      .current_dir(self.temp.path());
    cmd
  }

  /// Where a built binary lands.
  pub fn artifact(&self, name: &str) -> PathBuf {
    self
      .root()
      .join("target/armv5te-unknown-linux-uclibceabi/release")
      .join(name)
  }

  pub fn archive(&self) -> PathBuf {
    self.root().join("release/update.tar.gz")
  }

  /// Packages cargo was asked to build, in order.
  pub fn build_order(&self) -> Vec<String> {
    fs::read_to_string(self.root().join("target/build-order.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// The stack size recorded in a binary's FLT header.
  pub fn stack_size(&self, path: &Path) -> u32 {
    let bytes = fs::read(path).unwrap();
    u32::from_be_bytes([bytes[24], bytes[25], bytes[26], bytes[27]])
  }

  pub fn curl_log(&self) -> Vec<String> {
    fs::read_to_string(self.root().join("curl.log"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }
}
