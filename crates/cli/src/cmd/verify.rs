//! Implementation of the `fltrel verify` command.

use std::path::Path;

use anyhow::{Result, bail};

use fltrel_lib::package::verify_archive;

use super::Context;
use crate::output::{Drift, print_drift, print_json, print_stat, print_success, short_digest};

/// Recompute every digest in `archive` and compare with its manifest.
///
/// Fails when any entry is missing, extra, altered, or not owned by root.
pub fn cmd_verify(ctx: &Context, archive: &Path) -> Result<()> {
  let report = verify_archive(archive, &ctx.config.release.manifest_name)?;

  if ctx.output.is_json() {
    print_json(&report)?;
  } else if report.is_clean() {
    print_success(&format!("{} matches its manifest", archive.display()));
    print_stat("sha256", &report.sha256.0);
    print_stat("Files", &report.manifest.len().to_string());
  } else {
    for path in &report.diff.missing {
      print_drift(Drift::Missing, path, "missing");
    }
    for path in &report.diff.extra {
      print_drift(Drift::Extra, path, "not in manifest");
    }
    for path in &report.diff.mismatched {
      let expected = report.manifest.get(path).map(|d| short_digest(&d.0)).unwrap_or_default();
      print_drift(Drift::Altered, path, &format!("expected {}", expected));
    }
    for path in &report.unnormalized {
      print_drift(Drift::Altered, path, "owner or mtime not normalized");
    }
  }

  if !report.is_clean() {
    bail!("{} does not match its manifest ({} problem(s))", archive.display(), report.problems());
  }
  Ok(())
}
