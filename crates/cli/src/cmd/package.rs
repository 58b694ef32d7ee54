//! Implementation of the `fltrel package` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;

use fltrel_lib::package::ReleaseArchive;
use fltrel_lib::pipeline::{Flow, ReleaseRequest};

use super::{BuildArgs, Context, print_artifacts};
use crate::output::{format_bytes, format_duration, print_json, print_stat, print_success, short_digest};

pub fn cmd_package(ctx: &Context, args: &BuildArgs, output_dir: Option<PathBuf>) -> Result<()> {
  let start = Instant::now();
  let pipeline = ctx.pipeline(args)?;

  let mut request = ReleaseRequest::new(args.target_names(), Flow::Package);
  request.output_dir = output_dir;
  let outcome = pipeline.run(&request)?;

  if ctx.output.is_json() {
    return print_json(&outcome);
  }

  print_artifacts(&outcome.artifacts);
  if let Some(archive) = &outcome.archive {
    print_archive(archive);
  }
  print_success(&format!("Packaged in {}", format_duration(start.elapsed())));

  Ok(())
}

pub(crate) fn print_archive(archive: &ReleaseArchive) {
  println!();
  print_success(&format!("Archive: {}", archive.path.display()));
  print_stat("sha256", &archive.sha256.0);
  print_stat("Size", &format_bytes(archive.size));
  print_stat("Files", &archive.manifest.len().to_string());
  for (path, digest) in archive.manifest.entries() {
    print_stat(path, short_digest(&digest.0));
  }
}
