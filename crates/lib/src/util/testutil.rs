//! Test utilities for fltrel-lib.
//!
//! Stand-ins for the external tools the pipeline drives (cargo, the FLT header stamper,
//! rsync, curl) written as small POSIX shell scripts into a temp directory, plus a helper
//! producing minimal FLT images.

use std::fs;
use std::path::{Path, PathBuf};

use crate::stamp::flt::{FLT_MAGIC, HEADER_LEN, STACK_SIZE_OFFSET};

/// Build a minimal revision-4 FLT image with the given stack size and payload.
pub fn flt_image(stack_size: u32, payload: &[u8]) -> Vec<u8> {
  let mut image = vec![0u8; HEADER_LEN];
  image[..4].copy_from_slice(FLT_MAGIC);
  image[4..8].copy_from_slice(&4u32.to_be_bytes());
  image[8..12].copy_from_slice(&(HEADER_LEN as u32).to_be_bytes());
  image[STACK_SIZE_OFFSET..STACK_SIZE_OFFSET + 4].copy_from_slice(&stack_size.to_be_bytes());
  image.extend_from_slice(payload);
  image
}

/// Write an executable script into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  fs::create_dir_all(dir).unwrap();
  let path = dir.join(name);
  fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
  fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  path
}

/// A `cargo` that writes an FLT image for the requested package.
///
/// The image lands at `$CARGO_TARGET_DIR/<triple>/<release|debug>/<package>` and the
/// child environment is dumped to `$CARGO_TARGET_DIR/<package>.env`. Building the package
/// named `fail` exits 101 with a compiler-style diagnostic.
#[cfg(unix)]
pub fn fake_cargo(dir: &Path, fail: Option<&str>) -> PathBuf {
  let body = format!(
    r#"triple=""; mode=debug; pkg=""
while [ $# -gt 0 ]; do
  case "$1" in
    --target) triple="$2"; shift 2 ;;
    --release) mode=release; shift ;;
    --package|-p) pkg="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$CARGO_TARGET_DIR"
echo "$pkg" >> "$CARGO_TARGET_DIR/build-order.log"
if [ "$pkg" = "{fail}" ]; then
  echo "error: could not compile \`$pkg\` due to previous error" >&2
  exit 101
fi
out="$CARGO_TARGET_DIR/$triple/$mode"
mkdir -p "$out"
env | sort > "$CARGO_TARGET_DIR/$pkg.env"
{{ printf 'bFLT\000\000\000\004'; head -c 56 /dev/zero; printf '%s' "$pkg"; }} > "$out/$pkg"
"#,
    fail = fail.unwrap_or("")
  );
  write_script(dir, "cargo", &body)
}

/// How a fake stamper behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StamperMode {
  /// Writes the requested size big-endian at the stack-size offset.
  Correct,
  /// Scribbles over the header then exits non-zero.
  Fails,
  /// Exits zero without touching the file.
  NoOp,
}

/// A `flthdr`-style stamper invoked as `<tool> -s <size> <file>`.
#[cfg(unix)]
pub fn fake_stamper(dir: &Path, mode: StamperMode) -> PathBuf {
  let body = match mode {
    StamperMode::Correct => format!(
      r#"[ "$1" = "-s" ] || {{ echo "usage: flthdr -s size file" >&2; exit 2; }}
size=$(($2))
b() {{ printf "\\$(printf '%03o' $(( (size >> $1) & 255 )))"; }}
{{ b 24; b 16; b 8; b 0; }} | dd of="$3" bs=1 seek={offset} count=4 conv=notrunc 2>/dev/null
"#,
      offset = STACK_SIZE_OFFSET
    ),
    StamperMode::Fails => "printf 'XXXX' | dd of=\"$3\" bs=1 seek=0 count=4 conv=notrunc 2>/dev/null\n\
       echo \"flthdr: cannot rewrite header\" >&2\nexit 1\n"
      .to_string(),
    StamperMode::NoOp => "exit 0\n".to_string(),
  };
  write_script(dir, "flthdr", &body)
}

/// An `rsync` that copies its source operands into the (local) destination directory,
/// logs its arguments to `<dir>/rsync.log`, and exits with `exit_code` if given.
#[cfg(unix)]
pub fn fake_rsync(dir: &Path, exit_code: Option<i32>) -> PathBuf {
  let log = dir.join("rsync.log");
  let body = match exit_code {
    Some(code) => format!(
      "echo \"$@\" >> '{log}'\necho \"rsync error: simulated (code {code})\" >&2\nexit {code}\n",
      log = log.display()
    ),
    None => format!(
      r#"echo "$@" >> '{log}'
for last; do :; done
dest="$last"
mkdir -p "$dest"
for arg; do
  case "$arg" in
    -*) ;;
    "$dest") ;;
    *) cp "$arg" "$dest" ;;
  esac
done
"#,
      log = log.display()
    ),
  };
  write_script(dir, "rsync", &body)
}

/// A `curl` that logs `<file> <url>` lines to `<dir>/curl.log`.
///
/// With `fail_on = Some((n, code))` the n-th invocation (1-based) exits with `code`.
#[cfg(unix)]
pub fn fake_curl(dir: &Path, fail_on: Option<(usize, i32)>) -> PathBuf {
  let log = dir.join("curl.log");
  let (fail_at, code) = fail_on.unwrap_or((0, 0));
  let body = format!(
    r#"file=""; url=""
while [ $# -gt 0 ]; do
  case "$1" in
    --upload-file|-T) file="$2"; shift 2 ;;
    -*) shift ;;
    *) url="$1"; shift ;;
  esac
done
echo "$file $url" >> '{log}'
n=$(wc -l < '{log}')
if [ "$n" -eq {fail_at} ]; then
  echo "curl: simulated failure" >&2
  exit {code}
fi
"#,
    log = log.display()
  );
  write_script(dir, "curl", &body)
}

/// Lay out a workspace root with the default toolchain tree and a working stamper.
#[cfg(unix)]
pub fn fake_workspace(root: &Path) {
  let bin = root.join("toolchains/iobc/usr/bin");
  write_script(&bin, "arm-linux-gcc", "exit 0\n");
  fake_stamper(&bin, StamperMode::Correct);
  fs::create_dir_all(root.join("third-party/rust-std")).unwrap();
}
