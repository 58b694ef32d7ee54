//! Implementation of the `fltrel build-targets` command.

use std::time::Instant;

use anyhow::Result;

use fltrel_lib::pipeline::{Flow, ReleaseRequest};

use super::{BuildArgs, Context, print_artifacts};
use crate::output::{format_duration, print_json, print_success};

/// Cross-compile and stamp the requested targets.
pub fn cmd_build(ctx: &Context, args: &BuildArgs) -> Result<()> {
  let start = Instant::now();
  let pipeline = ctx.pipeline(args)?;

  let outcome = pipeline.run(&ReleaseRequest::new(args.target_names(), Flow::Local))?;

  if ctx.output.is_json() {
    return print_json(&outcome);
  }

  print_success(&format!(
    "Built {} target(s) for {} in {}",
    outcome.artifacts.len(),
    outcome.triple,
    format_duration(start.elapsed())
  ));
  print_artifacts(&outcome.artifacts);

  Ok(())
}
